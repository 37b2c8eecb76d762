use tangle_core::result::Error;
use tangle_core::{scan_source, SourceItem};

const FIXTURE: &str = include_str!("../../fixtures/MainActivity.smali");

#[test]
fn test_extracts_every_method_in_order() {
    tangle_tests::init_tracing();
    let source = scan_source(FIXTURE).unwrap();

    assert_eq!(source.method_count(), 5);
    let starts: Vec<usize> = source.methods().map(|m| m.line).collect();
    assert_eq!(starts, vec![11, 20, 36, 59, 62]);

    let names: Vec<&str> = source
        .methods()
        .map(|m| m.declaration().split_whitespace().last().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "<init>()V",
            "clamp(III)I",
            "onCreate(Landroid/os/Bundle;)V",
            "onReset()V",
            "score(I)I"
        ]
    );

    for method in source.methods() {
        assert!(method.lines.first().unwrap().starts_with(".method"));
        assert_eq!(method.lines.last().unwrap(), ".end method");
    }
}

#[test]
fn test_header_and_interstitial_text() {
    let source = scan_source(FIXTURE).unwrap();

    assert_eq!(source.header.len(), 10);
    assert_eq!(source.header[0], ".class public Lcom/example/demo/MainActivity;");
    assert_eq!(source.header[9], "# direct methods");

    let texts: Vec<&Vec<String>> = source
        .items
        .iter()
        .filter_map(|item| match item {
            SourceItem::Text(lines) => Some(lines),
            SourceItem::Method(_) => None,
        })
        .collect();
    assert_eq!(texts.len(), 4);
    assert_eq!(texts[1], &vec!["".to_string(), "".to_string(), "# virtual methods".to_string()]);
}

#[test]
fn test_scanning_is_lossless() {
    let source = scan_source(FIXTURE).unwrap();

    let mut lines: Vec<String> = source.header.clone();
    for item in &source.items {
        match item {
            SourceItem::Method(method) => lines.extend(method.lines.iter().cloned()),
            SourceItem::Text(text) => lines.extend(text.iter().cloned()),
        }
    }
    assert_eq!(lines, FIXTURE.lines().collect::<Vec<_>>());
}

#[test]
fn test_rescanning_a_method_yields_that_method() {
    let source = scan_source(FIXTURE).unwrap();

    for method in source.methods() {
        let rescanned = scan_source(&method.text()).unwrap();
        assert!(rescanned.header.is_empty());
        assert_eq!(rescanned.items.len(), 1);

        let again = rescanned.methods().next().unwrap();
        assert_eq!(again.line, 1);
        assert_eq!(again.lines, method.lines);
    }
}

#[test]
fn test_no_methods_is_header_only() {
    let text = ".class public LEmpty;\n.super Ljava/lang/Object;\n";
    let source = scan_source(text).unwrap();
    assert_eq!(source.method_count(), 0);
    assert!(source.items.is_empty());
    assert_eq!(source.header.len(), 2);

    let empty = scan_source("").unwrap();
    assert!(empty.header.is_empty());
    assert!(empty.items.is_empty());
}

#[test]
fn test_crlf_input() {
    let text = ".class LA;\r\n.method a()V\r\n    .locals 0\r\n    return-void\r\n.end method\r\n";
    let source = scan_source(text).unwrap();
    let method = source.methods().next().unwrap();
    assert_eq!(method.lines, vec![".method a()V", "    .locals 0", "    return-void", ".end method"]);
}

#[test]
fn test_framing_errors_carry_line_numbers() {
    let nested = ".class LA;\n.method a()V\n.method b()V\n.end method\n";
    assert!(matches!(
        scan_source(nested),
        Err(Error::NestedMethod { line: 3, open: 2 })
    ));

    let stray = ".class LA;\n.end method\n";
    assert!(matches!(
        scan_source(stray),
        Err(Error::UnexpectedMethodEnd { line: 2 })
    ));

    let open = ".class LA;\n\n.method a()V\n    return-void\n";
    assert!(matches!(
        scan_source(open),
        Err(Error::UnterminatedMethod { line: 3 })
    ));
}
