//! Stage 1 pre-filter: classify every changed path in a
//! commit as source code worth parsing, or generated/config/lock/docs
//! noise to skip outright. Cuts the surviving set by 80-95% before the
//! much more expensive Stage 2 parse runs.
//!
//! On LLM unavailability this falls back to an extension-and-path
//! heuristic, the same shape as [`crate::resolve`]'s disambiguation
//! fallback and `grapher::comment`'s regex fallback.

use std::sync::OnceLock;

use ai_llm_service::LlmServiceProfiles;
use regex::Regex;
use tracing::debug;

const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "jsx", "ts", "tsx", "go", "java", "kt", "rb", "php", "c", "h", "cc", "cpp",
    "hpp", "cs", "swift", "scala", "dart", "sql",
];

const NOISE_PATH_MARKERS: &[&str] = &[
    "vendor/", "node_modules/", "dist/", "build/", "target/", ".min.", "generated/", "__generated__/",
];

const NOISE_EXTENSIONS: &[&str] = &[
    "lock", "md", "txt", "json", "yaml", "yml", "toml", "svg", "png", "jpg", "jpeg", "gif", "ico",
    "woff", "woff2", "ttf", "pdf", "snap",
];

fn lockfile_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(^|/)(Cargo\.lock|package-lock\.json|yarn\.lock|pnpm-lock\.yaml|poetry\.lock|Gemfile\.lock)$").unwrap()
    })
}

const SYSTEM_PROMPT: &str = "For each file path below, answer SOURCE if it is hand-written application source code, or NOISE if it is generated, vendored, a lockfile, config, or documentation. Reply with one SOURCE/NOISE token per line, in the same order as the input paths.";

/// Classifies every path in `paths`, trying the LLM first when given a
/// profile and falling back to the heuristic on any error or when none is
/// given. Order of the returned vector matches `paths`.
pub async fn classify(llm: Option<&LlmServiceProfiles>, paths: &[String]) -> Vec<bool> {
    if paths.is_empty() {
        return Vec::new();
    }
    if let Some(llm) = llm {
        let prompt = paths.join("\n");
        match llm.generate_fast(&prompt, Some(SYSTEM_PROMPT)).await {
            Ok(reply) => {
                let parsed = parse_llm_reply(&reply, paths.len());
                if let Some(parsed) = parsed {
                    return parsed;
                }
                debug!("pre-filter LLM reply did not match input length, falling back to heuristic");
            }
            Err(err) => {
                debug!(error = %err, "pre-filter LLM call failed, falling back to heuristic");
            }
        }
    }
    paths.iter().map(|p| is_source_heuristic(p)).collect()
}

fn parse_llm_reply(reply: &str, expected: usize) -> Option<Vec<bool>> {
    let lines: Vec<bool> = reply
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| l.eq_ignore_ascii_case("SOURCE"))
        .collect();
    (lines.len() == expected).then_some(lines)
}

/// Deterministic fallback: an extension allow-list, a noise-extension and
/// noise-path-marker deny-list, and an explicit lockfile-name check since
/// those rarely carry a distinguishing extension.
pub fn is_source_heuristic(path: &str) -> bool {
    if lockfile_re().is_match(path) {
        return false;
    }
    if NOISE_PATH_MARKERS.iter().any(|m| path.contains(m)) {
        return false;
    }
    let Some(ext) = path.rsplit('.').next() else {
        return false;
    };
    let ext = ext.to_lowercase();
    if NOISE_EXTENSIONS.contains(&ext.as_str()) {
        return false;
    }
    SOURCE_EXTENSIONS.contains(&ext.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lockfiles_are_noise() {
        assert!(!is_source_heuristic("Cargo.lock"));
        assert!(!is_source_heuristic("frontend/package-lock.json"));
    }

    #[test]
    fn vendored_and_generated_paths_are_noise() {
        assert!(!is_source_heuristic("vendor/lib/thing.rs"));
        assert!(!is_source_heuristic("web/dist/bundle.min.js"));
    }

    #[test]
    fn source_extensions_pass() {
        assert!(is_source_heuristic("src/risk_index.rs"));
        assert!(is_source_heuristic("service/handlers.go"));
    }

    #[test]
    fn docs_and_config_are_noise() {
        assert!(!is_source_heuristic("README.md"));
        assert!(!is_source_heuristic("config/settings.yaml"));
    }

    #[tokio::test]
    async fn classify_without_llm_matches_heuristic() {
        let paths = vec!["src/main.rs".to_string(), "Cargo.lock".to_string()];
        let out = classify(None, &paths).await;
        assert_eq!(out, vec![true, false]);
    }
}
