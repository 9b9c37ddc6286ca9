//! JSON reporter
//!
//! Outputs the scan result document (`scanId`, `repositoryPath`,
//! `detectedLanguages`, `totalFiles`, `issues`, `summary`) pretty-printed.

use crate::models::ScanResults;
use anyhow::Result;

/// Render results as JSON
pub fn render(results: &ScanResults) -> Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_results;

    #[test]
    fn test_json_shape() {
        let json_str = render(&test_results()).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        assert_eq!(parsed["scanId"], "scan-1");
        assert_eq!(parsed["totalFiles"], 12);
        assert_eq!(parsed["summary"]["totalIssues"], 2);
        assert_eq!(parsed["summary"]["issuesByCategory"]["security"], 1);
        assert_eq!(parsed["summary"]["issuesBySeverity"]["warning"], 1);

        let issue = &parsed["issues"][0];
        assert_eq!(issue["filePath"], "app/settings.py");
        assert_eq!(issue["lineStart"], 2);
        assert_eq!(issue["lineEnd"], 2);
        assert_eq!(issue["recommendation"], "Use environment variables for secrets");
    }

    #[test]
    fn test_json_empty_issues() {
        let mut results = test_results();
        results.issues.clear();
        results.summary = Default::default();
        let parsed: serde_json::Value =
            serde_json::from_str(&render(&results).expect("render JSON")).expect("parse JSON");
        assert_eq!(parsed["issues"].as_array().expect("issues array").len(), 0);
    }
}
