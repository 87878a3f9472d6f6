use std::collections::BTreeMap;
use std::path::Path;

use colored::Colorize;
use sanscan_core::{DetectionResult, SanitizerKind};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Serialize)]
pub struct Report<'a> {
    path: &'a Path,
    sanitizers: Vec<SanitizerKind>,
    matches: BTreeMap<SanitizerKind, usize>,
}

#[derive(Tabled)]
struct MatchRow {
    #[tabled(rename = "Sanitizer")]
    sanitizer: String,
    #[tabled(rename = "Matching symbols")]
    symbols: usize,
}

impl<'a> Report<'a> {
    pub fn new(path: &'a Path, result: &DetectionResult) -> Self {
        let sanitizers: Vec<SanitizerKind> = result.kinds().collect();
        let matches = sanitizers
            .iter()
            .map(|&kind| (kind, result.matches(kind)))
            .collect();
        Self {
            path,
            sanitizers,
            matches,
        }
    }

    pub fn print_text(&self) {
        print!("{}", self.render_text());
        if !self.sanitizers.is_empty() {
            println!();
            println!("{}", self.match_table());
        }
    }

    fn render_text(&self) -> String {
        let path = self.path.display();
        if self.sanitizers.is_empty() {
            return format!("{}\n", format!("No sanitizers found in {path}").yellow());
        }

        let noun = if self.sanitizers.len() > 1 {
            "sanitizers"
        } else {
            "sanitizer"
        };
        let mut out = format!("{} {noun} found in {path}:\n", self.sanitizers.len())
            .bold()
            .to_string();
        for kind in &self.sanitizers {
            out.push_str(&format!(" - {}\n", kind.to_string().green()));
        }
        out
    }

    fn match_table(&self) -> Table {
        let rows = self.matches.iter().map(|(kind, &symbols)| MatchRow {
            sanitizer: kind.to_string(),
            symbols,
        });
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        table
    }
}
