//! `oncotier normalize` — offline variant notation normalization.
//!
//! Accepts a single gene/variant pair, a batch file, or stdin lines in
//! `GENE,VARIANT`, `GENE<TAB>VARIANT`, or `GENE VARIANT` form. Lines
//! starting with `#` are comments.

use clap::{Args, ValueEnum};
use oncotier_variant::{NormalizedVariant, Normalizer};
use serde::Serialize;
use std::io::BufRead;

#[derive(Args)]
pub struct NormalizeArgs {
    /// Gene symbol (e.g. BRAF)
    pub gene: Option<String>,
    /// Variant notation (e.g. V600E, Val600Glu, p.V600E)
    pub variant: Option<String>,
    /// Batch input file, one gene/variant pair per line
    #[arg(long, short)]
    pub batch: Option<String>,
    /// Read batch lines from stdin
    #[arg(long, short = 'i')]
    pub stdin: bool,
    #[arg(long, short, value_enum, default_value_t = Format::Json)]
    pub format: Format,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Table,
    Tsv,
}

#[derive(Debug, Serialize)]
struct NormalizeRow {
    gene: String,
    variant_original: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    variant_normalized: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    variant_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hgvs_protein: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl NormalizeRow {
    fn ok(v: NormalizedVariant) -> Self {
        Self {
            gene: v.gene,
            variant_original: v.variant_original,
            variant_normalized: Some(v.variant_normalized),
            variant_kind: Some(v.kind.as_str().to_string()),
            hgvs_protein: v.hgvs_protein,
            position: v.position,
            error: None,
        }
    }

    fn err(gene: &str, variant: &str, error: String) -> Self {
        Self {
            gene: gene.to_uppercase(),
            variant_original: variant.to_string(),
            variant_normalized: None,
            variant_kind: None,
            hgvs_protein: None,
            position: None,
            error: Some(error),
        }
    }
}

pub fn run(args: &NormalizeArgs) -> u8 {
    let pairs = match collect_pairs(args) {
        Ok(pairs) if !pairs.is_empty() => pairs,
        Ok(_) => {
            eprintln!("no input: pass GENE VARIANT, --batch FILE, or --stdin");
            return 2;
        }
        Err(e) => {
            eprintln!("input error: {e}");
            return 2;
        }
    };

    let normalizer = Normalizer::new();
    let rows: Vec<NormalizeRow> = pairs
        .iter()
        .map(|(gene, variant)| match normalizer.normalize(gene, variant) {
            Ok(v) => NormalizeRow::ok(v),
            Err(e) => NormalizeRow::err(gene, variant, e.to_string()),
        })
        .collect();

    match args.format {
        Format::Json => {
            let out = if rows.len() == 1 {
                serde_json::to_string_pretty(&rows[0])
            } else {
                serde_json::to_string_pretty(&rows)
            };
            println!("{}", out.unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}")));
        }
        Format::Table => print!("{}", format_table(&rows)),
        Format::Tsv => print!("{}", format_tsv(&rows)),
    }
    0
}

fn collect_pairs(args: &NormalizeArgs) -> anyhow::Result<Vec<(String, String)>> {
    if let Some(path) = &args.batch {
        let content = std::fs::read_to_string(path)?;
        return Ok(content.lines().filter_map(parse_batch_line).collect());
    }
    if args.stdin {
        let stdin = std::io::stdin();
        let mut pairs = Vec::new();
        for line in stdin.lock().lines() {
            if let Some(pair) = parse_batch_line(&line?) {
                pairs.push(pair);
            }
        }
        return Ok(pairs);
    }
    match (&args.gene, &args.variant) {
        (Some(gene), Some(variant)) => Ok(vec![(gene.clone(), variant.clone())]),
        _ => Ok(vec![]),
    }
}

fn parse_batch_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    for separator in [',', '\t'] {
        if let Some((gene, variant)) = line.split_once(separator) {
            return Some((gene.trim().to_string(), variant.trim().to_string()));
        }
    }
    line.split_once(char::is_whitespace)
        .map(|(gene, variant)| (gene.trim().to_string(), variant.trim().to_string()))
}

fn format_table(rows: &[NormalizeRow]) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&"=".repeat(50));
        out.push('\n');
        out.push_str(&format!("Gene:        {}\n", row.gene));
        out.push_str(&format!("Original:    {}\n", row.variant_original));
        match &row.error {
            Some(error) => out.push_str(&format!("Error:       {}\n", error)),
            None => {
                out.push_str(&format!(
                    "Normalized:  {}\n",
                    row.variant_normalized.as_deref().unwrap_or("-")
                ));
                out.push_str(&format!(
                    "Kind:        {}\n",
                    row.variant_kind.as_deref().unwrap_or("-")
                ));
                out.push_str(&format!(
                    "HGVS:        {}\n",
                    row.hgvs_protein.as_deref().unwrap_or("-")
                ));
                out.push_str(&format!(
                    "Position:    {}\n",
                    row.position.map(|p| p.to_string()).unwrap_or_else(|| "-".into())
                ));
            }
        }
    }
    out.push_str(&"=".repeat(50));
    out.push('\n');
    out
}

fn format_tsv(rows: &[NormalizeRow]) -> String {
    let mut out = String::from(
        "gene\tvariant_original\tvariant_normalized\tvariant_kind\thgvs_protein\tposition\terror\n",
    );
    for row in rows {
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
            row.gene,
            row.variant_original,
            row.variant_normalized.as_deref().unwrap_or(""),
            row.variant_kind.as_deref().unwrap_or(""),
            row.hgvs_protein.as_deref().unwrap_or(""),
            row.position.map(|p| p.to_string()).unwrap_or_default(),
            row.error.as_deref().unwrap_or(""),
        ));
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
