use crate::flatten::{Flatten, FlattenConfig};
use crate::pass::{DefaultPass, Pass};
use crate::validator::replay_dispatch;
use crate::{Error, Result, Transform};
use serde::{Deserialize, Serialize};
use tangle_core::seed::Seed;
use tangle_core::{scan_source, split_method, Method, SourceItem};

/// Configuration for the obfuscation pipeline
pub struct ObfuscationConfig {
    /// Cryptographic seed for deterministic obfuscation
    pub seed: Seed,
    /// List of transforms to apply
    pub transforms: Vec<Box<dyn Transform>>,
    /// Label settings shared by the flattener and the replay check
    pub flatten: FlattenConfig,
    /// Keep text between and after methods (fields, comments) in the output
    pub preserve_interstitial: bool,
    /// Replay every flattened method and compare it with the original body
    pub verify: bool,
}

impl ObfuscationConfig {
    /// Create config with a specific seed and the default flattening transform
    pub fn with_seed(seed: Seed) -> Self {
        Self {
            seed,
            transforms: vec![Box::new(Flatten::new())],
            flatten: FlattenConfig::default(),
            preserve_interstitial: false,
            verify: false,
        }
    }
}

impl Default for ObfuscationConfig {
    fn default() -> Self {
        Self::with_seed(Seed::generate())
    }
}

impl std::fmt::Debug for ObfuscationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObfuscationConfig")
            .field(
                "transforms",
                &format!("{} transforms", self.transforms.len()),
            )
            .field("flatten", &self.flatten)
            .field("preserve_interstitial", &self.preserve_interstitial)
            .field("verify", &self.verify)
            .finish()
    }
}

/// Per-method summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodReport {
    /// Method name with prototype
    pub name: String,
    /// 1-based line of the declaration in the input
    pub line: usize,
    /// Number of `.line`-delimited blocks in the input
    pub body_blocks: usize,
    /// Jump-table entries after flattening (0 when unchanged)
    pub cases: usize,
    /// Transforms that changed the method
    pub transforms: Vec<String>,
}

/// Summary of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObfuscationReport {
    /// Fingerprint of the seed, identifying the run without revealing the seed
    pub seed_fingerprint: String,
    /// Names of the configured transforms, in order
    pub transforms: Vec<String>,
    /// Number of methods found in the input
    pub methods_total: usize,
    /// Number of methods changed by at least one transform
    pub methods_changed: usize,
    /// Number of input lines
    pub input_lines: usize,
    /// Number of output lines
    pub output_lines: usize,
    /// Per-method details, in source order
    pub methods: Vec<MethodReport>,
}

impl ObfuscationReport {
    /// Pretty JSON rendering of the report.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Result of the obfuscation pipeline
#[derive(Debug, Clone)]
pub struct ObfuscationResult {
    /// The transformed file text
    pub output: String,
    /// Run summary
    pub report: ObfuscationReport,
}

/// Main obfuscation pipeline: transforms every method of a smali file.
///
/// The output is the header (everything before the first method) followed by every method in
/// source order; text between methods is only kept with `preserve_interstitial`. Methods
/// always end with a newline, while text reaching the end of the input keeps the input's final
/// newline, or lack of one. Any structural error aborts the whole run and no output is
/// produced.
pub fn obfuscate_source(source: &str, config: ObfuscationConfig) -> Result<ObfuscationResult> {
    tracing::debug!("Starting obfuscation pipeline:");
    tracing::debug!("  Transforms: {}", config.transforms.len());

    let scanned = scan_source(source)?;
    tracing::debug!("  Header lines: {}", scanned.header.len());
    tracing::debug!("  Methods: {}", scanned.method_count());

    let originals: Vec<Method> = scanned
        .methods()
        .map(split_method)
        .collect::<std::result::Result<_, _>>()?;
    let mut methods = originals.clone();

    let applied = DefaultPass.run(&mut methods, &config.transforms, &config.seed)?;

    if config.verify {
        let labels = config.flatten.labels();
        for (original, method) in originals.iter().zip(&methods) {
            if !method.is_flattened() {
                continue;
            }
            let replay = replay_dispatch(method, &labels)?;
            let replayed: Vec<&str> = replay.lines().collect();
            let body: Vec<&str> = original
                .body_lines()
                .filter(|line| !line.trim().is_empty())
                .collect();
            if replayed.is_empty() || !body.ends_with(&replayed) {
                return Err(Error::ReplayMismatch(method.name().to_string()));
            }
            tracing::debug!("  verified {} ({} cases)", method.name(), replay.order.len());
        }
    }

    let mut output = String::new();
    for line in &scanned.header {
        output.push_str(line);
        output.push('\n');
    }
    let mut transformed = methods.iter();
    for item in &scanned.items {
        match item {
            SourceItem::Method(_) => {
                if let Some(method) = transformed.next() {
                    output.push_str(&method.render());
                }
            }
            SourceItem::Text(lines) if config.preserve_interstitial => {
                for line in lines {
                    output.push_str(line);
                    output.push('\n');
                }
            }
            SourceItem::Text(_) => {}
        }
    }

    // Input copied verbatim up to its last line keeps a missing final newline missing.
    let ends_verbatim = match scanned.items.last() {
        None => true,
        Some(SourceItem::Text(_)) => config.preserve_interstitial,
        Some(SourceItem::Method(_)) => false,
    };
    if ends_verbatim && !source.ends_with('\n') && output.ends_with('\n') {
        output.pop();
    }

    let method_reports: Vec<MethodReport> = originals
        .iter()
        .zip(&methods)
        .zip(applied)
        .map(|((original, method), applied)| MethodReport {
            name: original.name().to_string(),
            line: original.line,
            body_blocks: original.body_block_count(),
            cases: if method.is_flattened() {
                method.body_block_count()
            } else {
                0
            },
            transforms: applied.into_iter().map(str::to_string).collect(),
        })
        .collect();

    let report = ObfuscationReport {
        seed_fingerprint: config.seed.fingerprint(),
        transforms: config
            .transforms
            .iter()
            .map(|t| t.name().to_string())
            .collect(),
        methods_total: methods.len(),
        methods_changed: method_reports
            .iter()
            .filter(|m| !m.transforms.is_empty())
            .count(),
        input_lines: source.lines().count(),
        output_lines: output.lines().count(),
        methods: method_reports,
    };

    tracing::debug!(
        "  Changed {}/{} methods, {} -> {} lines",
        report.methods_changed,
        report.methods_total,
        report.input_lines,
        report.output_lines
    );

    Ok(ObfuscationResult { output, report })
}
