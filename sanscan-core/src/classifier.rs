use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::inspect::SymbolExtractor;
use crate::{ClassificationError, Policy, SanitizerKind};

/// Sanitizers found in one symbol dump, with the number of symbol lines
/// attributed to each.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectionResult {
    matches: BTreeMap<SanitizerKind, usize>,
}

impl DetectionResult {
    /// Detected kinds in priority order.
    pub fn kinds(&self) -> impl Iterator<Item = SanitizerKind> + '_ {
        self.matches.keys().copied()
    }

    pub fn contains(&self, kind: SanitizerKind) -> bool {
        self.matches.contains_key(&kind)
    }

    pub fn matches(&self, kind: SanitizerKind) -> usize {
        self.matches.get(&kind).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    fn record(&mut self, kind: SanitizerKind) {
        *self.matches.entry(kind).or_default() += 1;
    }
}

impl FromIterator<SanitizerKind> for DetectionResult {
    fn from_iter<I: IntoIterator<Item = SanitizerKind>>(iter: I) -> Self {
        let mut result = DetectionResult::default();
        for kind in iter {
            result.record(kind);
        }
        result
    }
}

/// Sanitizer a single symbol line belongs to.
///
/// A line matching prefixes of several kinds goes to the first one in
/// [`SanitizerKind::ALL`] order.
pub fn classify_line(line: &str, policy: &Policy) -> Option<SanitizerKind> {
    SanitizerKind::ALL.into_iter().find(|&kind| {
        policy
            .prefixes(kind)
            .iter()
            .any(|prefix| line.contains(prefix.as_str()))
    })
}

pub fn classify(symbol_dump: &str, policy: &Policy) -> DetectionResult {
    symbol_dump
        .lines()
        .filter_map(|line| classify_line(line, policy))
        .collect()
}

/// Extracts the symbol table of `path` and classifies it.
pub fn detect<E>(
    path: &Path,
    extractor: &E,
    policy: &Policy,
) -> Result<DetectionResult, ClassificationError>
where
    E: SymbolExtractor + ?Sized,
{
    let dump = extractor
        .symbol_table(path)
        .map_err(|source| ClassificationError::Unavailable {
            path: path.to_path_buf(),
            source,
        })?;
    let result = classify(&dump, policy);
    log::debug!(
        "{}: {} sanitizer(s) across {} symbol lines",
        path.display(),
        result.len(),
        dump.lines().count()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InspectError;

    #[test]
    fn detects_all_three_kinds() {
        let dump = "__asan_init\n__tsan_read\n__msan_chain_origin\n";
        let result = classify(dump, &Policy::default());
        assert_eq!(result.kinds().collect::<Vec<_>>(), SanitizerKind::ALL.to_vec());
    }

    #[test]
    fn no_matching_lines_is_empty() {
        let dump = "Symbol table '.symtab' contains 2 entries:\n     1: 0000000000001139    22 FUNC    GLOBAL main\n";
        let result = classify(dump, &Policy::default());
        assert!(result.is_empty());
        assert_eq!(result.len(), 0);
    }

    #[test]
    fn address_wins_on_ambiguous_line() {
        let line = "  42: 0000000000000000     0 FUNC    GLOBAL __tsan_and___asan_report";
        let policy = Policy::default();
        assert_eq!(classify_line(line, &policy), Some(SanitizerKind::Address));

        let result = classify(line, &policy);
        assert!(result.contains(SanitizerKind::Address));
        assert!(!result.contains(SanitizerKind::Thread));
    }

    #[test]
    fn thread_wins_over_memory() {
        let policy = Policy::default();
        assert_eq!(
            classify_line("__msan_x __tsan_y", &policy),
            Some(SanitizerKind::Thread)
        );
    }

    #[test]
    fn tie_break_is_per_line_not_per_file() {
        let dump = "__asan_report_load8 __tsan_write4\n__tsan_write4\n";
        let result = classify(dump, &Policy::default());
        assert!(result.contains(SanitizerKind::Address));
        assert!(result.contains(SanitizerKind::Thread));
        assert_eq!(result.matches(SanitizerKind::Thread), 1);
    }

    #[test]
    fn prefixes_match_anywhere_in_line() {
        let dump = "   7: 0000000000000000     0 FUNC    GLOBAL ___asan_globals_registered";
        let result = classify(dump, &Policy::default());
        assert_eq!(result.matches(SanitizerKind::Address), 1);
    }

    #[test]
    fn result_ignores_line_order_and_is_repeatable() {
        let lines = ["__msan_param_tls", "main", "__asan_init", "__asan_init", "__tsan_func_entry"];
        let policy = Policy::default();
        let forward = classify(&lines.join("\n"), &policy);
        let reversed: Vec<_> = lines.iter().rev().copied().collect();
        let backward = classify(&reversed.join("\n"), &policy);

        assert_eq!(forward, backward);
        assert_eq!(forward, classify(&lines.join("\n"), &policy));
        assert_eq!(forward.matches(SanitizerKind::Address), 2);
    }

    #[test]
    fn custom_policy_prefixes() {
        let policy = Policy::new(
            ["application/x-executable"],
            [
                (SanitizerKind::Address, vec!["asan_rt_"]),
                (SanitizerKind::Thread, vec!["tsan_rt_"]),
                (SanitizerKind::Memory, vec!["msan_rt_"]),
            ],
        )
        .unwrap();
        let result = classify("__asan_init\nmsan_rt_start", &policy);
        assert_eq!(result.kinds().collect::<Vec<_>>(), vec![SanitizerKind::Memory]);
    }

    struct FailingExtractor;

    impl SymbolExtractor for FailingExtractor {
        fn symbol_table(&self, _: &Path) -> Result<String, InspectError> {
            Err(InspectError::ToolFailed {
                tool: "readelf -s -W".into(),
                status: "exit status: 1".into(),
                stderr: "readelf: Error: Not an ELF file".into(),
            })
        }
    }

    struct FixedExtractor(&'static str);

    impl SymbolExtractor for FixedExtractor {
        fn symbol_table(&self, _: &Path) -> Result<String, InspectError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn extraction_failure_is_classification_unavailable() {
        let err = detect(Path::new("/tmp/app"), &FailingExtractor, &Policy::default()).unwrap_err();
        let ClassificationError::Unavailable { path, .. } = err;
        assert_eq!(path, Path::new("/tmp/app"));
    }

    #[test]
    fn detect_classifies_extracted_dump() {
        let result = detect(
            Path::new("/tmp/app"),
            &FixedExtractor("__tsan_init\n__tsan_read8"),
            &Policy::default(),
        )
        .unwrap();
        assert_eq!(result.kinds().collect::<Vec<_>>(), vec![SanitizerKind::Thread]);
        assert_eq!(result.matches(SanitizerKind::Thread), 2);
    }
}
