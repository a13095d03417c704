use grep::regex::RegexMatcher;
use grep::searcher::{Searcher, Sink, SinkMatch};
use std::error::Error;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// Source trees the lint gate covers. Anything else under the package root
// (reference material, build output) is left alone.
const SCANNED_DIRS: [&str; 4] = ["score", "src", "tests", "benches"];

// One source-text rule: a line regex plus a filter that decides whether a
// matched line is a real violation.
struct Rule {
    title: &'static str,
    pattern: &'static str,
    is_violation: fn(&str) -> bool,
    advice: &'static str,
}

const RULES: [Rule; 4] = [
    Rule {
        title: "underscore-prefixed names",
        pattern: r"\b(_[a-zA-Z0-9_]+)\b",
        is_violation: underscore_outside_comment_or_string,
        advice: "Either use the binding (removing the underscore) or remove it completely.",
    },
    Rule {
        title: "forbidden comment markers",
        pattern: r"(//|/\*).*(?:FIXED|CORRECTED|FIX|FIXES|NEW|CHANGED|CHANGES|CHANGE|MODIFIED|MODIFIES|MODIFY|UPDATED|UPDATES|UPDATE)",
        is_violation: always,
        advice: "Comments describe the code as it is, not how it got there.",
    },
    Rule {
        title: "'**' in non-doc comments",
        pattern: r"(//|/\*).*\*\*",
        is_violation: not_doc_comment,
        advice: "Markdown emphasis belongs in doc comments only.",
    },
    Rule {
        title: "#[allow(dead_code)] attributes",
        pattern: r"#\s*\[\s*allow\s*\(\s*dead_code\s*\)\s*\]",
        is_violation: always,
        advice: "Either use the code (removing the attribute) or remove it completely.",
    },
];

fn always(_: &str) -> bool {
    true
}

fn not_doc_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    !(trimmed.starts_with("///") || trimmed.starts_with("//!"))
}

fn underscore_outside_comment_or_string(line: &str) -> bool {
    if line.trim_start().starts_with("//") {
        return false;
    }
    // Odd-numbered segments between quotes are string contents.
    let in_string = line
        .split('"')
        .enumerate()
        .any(|(i, part)| i % 2 == 1 && part.contains('_'));
    !in_string
}

// Collects the matching lines of one file that the rule's filter accepts.
struct LineCollector<'r> {
    rule: &'r Rule,
    hits: Vec<String>,
}

impl Sink for LineCollector<'_> {
    type Error = std::io::Error;

    fn matched(&mut self, _: &Searcher, mat: &SinkMatch) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        let line_text = std::str::from_utf8(mat.bytes()).unwrap_or("").trim_end();
        if (self.rule.is_violation)(line_text) {
            self.hits.push(format!("{line_number}:{line_text}"));
        }
        Ok(true)
    }
}

fn rust_sources() -> Vec<PathBuf> {
    SCANNED_DIRS
        .iter()
        .filter(|dir| Path::new(dir).is_dir())
        .flat_map(|dir| WalkDir::new(dir).into_iter().filter_map(|e| e.ok()))
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        .map(|e| e.into_path())
        .collect()
}

fn check_rule(rule: &Rule, sources: &[PathBuf]) -> Result<Option<String>, Box<dyn Error>> {
    let matcher = RegexMatcher::new_line_matcher(rule.pattern)?;
    let mut searcher = Searcher::new();
    let mut report = String::new();

    for path in sources {
        let mut collector = LineCollector {
            rule,
            hits: Vec::new(),
        };
        searcher.search_path(&matcher, path, &mut collector)?;
        if collector.hits.is_empty() {
            continue;
        }
        report.push_str(&format!(
            "\n❌ ERROR: Found {} {} in {}:\n",
            collector.hits.len(),
            rule.title,
            path.display()
        ));
        for hit in &collector.hits {
            report.push_str(&format!("   {hit}\n"));
        }
    }

    if report.is_empty() {
        Ok(None)
    } else {
        report.push_str(&format!(
            "\n⚠️ {} are not allowed in this project.\n   {}\n",
            rule.title, rule.advice
        ));
        Ok(Some(report))
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for dir in SCANNED_DIRS {
        println!("cargo:rerun-if-changed={dir}");
    }

    let sources = rust_sources();
    let mut failed = false;
    for rule in &RULES {
        match check_rule(rule, &sources) {
            Ok(None) => {}
            Ok(Some(report)) => {
                eprintln!("{report}");
                failed = true;
            }
            Err(e) => {
                eprintln!("Lint gate could not check {}: {e}", rule.title);
                failed = true;
            }
        }
    }
    if failed {
        std::process::exit(1);
    }
}
