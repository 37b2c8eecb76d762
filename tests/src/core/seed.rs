use rand::RngCore;
use tangle_core::result::Error;
use tangle_core::seed::{Seed, SEED_LEN};

const SEED: &str = "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";

#[test]
fn test_deterministic_rng() {
    let seed = Seed::from_hex(SEED).unwrap();

    let mut rng1 = seed.rng();
    let mut rng2 = seed.rng();

    assert_eq!(rng1.next_u32(), rng2.next_u32());
    assert_eq!(rng1.next_u64(), rng2.next_u64());
}

#[test]
fn test_hex_round_trip_and_fingerprint() {
    let seed: Seed = SEED.parse().unwrap();
    assert_eq!(seed.to_string(), SEED);
    assert_eq!(Seed::from_hex(&SEED[2..]).unwrap(), seed);

    let fingerprint = seed.fingerprint();
    assert!(fingerprint.starts_with("0x"));
    assert_eq!(fingerprint.len(), 2 + SEED_LEN * 2);
    assert_ne!(fingerprint, seed.to_string());
    assert!(!format!("{seed:?}").contains(&SEED[2..]));
}

#[test]
fn test_every_seed_byte_reaches_the_rng() {
    let mut bytes = [0x11u8; SEED_LEN];
    let base = Seed::from_bytes(bytes);
    bytes[SEED_LEN - 1] ^= 1;
    let last_byte_flipped = Seed::from_bytes(bytes);

    let mut rng1 = base.rng();
    let mut rng2 = last_byte_flipped.rng();
    let draws1: Vec<u64> = (0..4).map(|_| rng1.next_u64()).collect();
    let draws2: Vec<u64> = (0..4).map(|_| rng2.next_u64()).collect();
    assert_ne!(draws1, draws2);
}

#[test]
fn test_invalid_seeds() {
    assert!(matches!(Seed::from_hex("0x1234"), Err(Error::InvalidSeedLength(4))));
    let not_hex = "z".repeat(64);
    assert!(matches!(Seed::from_hex(&not_hex), Err(Error::InvalidSeedHex)));
}
