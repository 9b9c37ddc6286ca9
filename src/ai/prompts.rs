//! Prompt builders for remote review
//!
//! The single-file prompt asks for a JSON array of issues; the batch prompt
//! asks for a JSON object keyed by file path.

/// One file as it appears in a prompt
#[derive(Debug, Clone, Copy)]
pub struct PromptFile<'a> {
    pub path: &'a str,
    pub language: &'a str,
    pub content: &'a str,
}

const CATEGORIES: &str = "\
1. Security vulnerabilities (SQL injection, XSS, hardcoded secrets, etc.)
2. Bugs and logic errors
3. Performance issues
4. Maintainability and code quality issues";

const ISSUE_EXAMPLE: &str = r#"{
    "category": "security",
    "severity": "error",
    "line_start": 10,
    "line_end": 10,
    "description": "Hardcoded API key detected",
    "recommendation": "Move API key to environment variables"
  }"#;

pub fn single_file_prompt(file: PromptFile<'_>) -> String {
    format!(
        "You are an expert code reviewer. Analyze the following {lang} code and identify issues.\n\n\
         File: {path}\n\n\
         Code:\n```{lang}\n{content}\n```\n\n\
         Identify issues in the following categories:\n{CATEGORIES}\n\n\
         For each issue, provide:\n\
         - Category (security, bug, performance, maintainability, or architecture)\n\
         - Severity (error, warning, or info)\n\
         - Line number(s) where the issue occurs\n\
         - Clear description of the issue\n\
         - Recommendation for fixing it\n\n\
         Format your response as a JSON array of issues:\n[\n  {ISSUE_EXAMPLE}\n]\n\n\
         If there are no issues, return an empty array: []\n",
        lang = file.language,
        path = file.path,
        content = file.content,
    )
}

pub fn batch_prompt(files: &[PromptFile<'_>]) -> String {
    let mut prompt = String::from(
        "You are an expert code reviewer. Analyze the following code files and identify issues in each.\n\n\
         Files to analyze:\n",
    );

    for (i, file) in files.iter().enumerate() {
        prompt.push_str(&format!(
            "\n--- File {}: {} ({}) ---\n```{}\n{}\n```\n",
            i + 1,
            file.path,
            file.language,
            file.language,
            file.content
        ));
    }

    prompt.push_str(&format!(
        "\nFor EACH file, identify issues in these categories:\n{CATEGORIES}\n\n\
         Format your response as a JSON object where keys are the exact file paths shown above \
         and values are arrays of issues:\n\
         {{\n  \"{first}\": [\n  {ISSUE_EXAMPLE}\n  ]\n}}\n\n\
         If a file has no issues, use an empty array.\n",
        first = files.first().map(|f| f.path).unwrap_or("file1.py"),
    ));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_prompt_embeds_file() {
        let p = single_file_prompt(PromptFile {
            path: "src/app.py",
            language: "python",
            content: "print('hi')",
        });
        assert!(p.contains("File: src/app.py"));
        assert!(p.contains("```python\nprint('hi')\n```"));
        assert!(p.contains("JSON array"));
    }

    #[test]
    fn test_batch_prompt_delimiters() {
        let files = [
            PromptFile {
                path: "a.py",
                language: "python",
                content: "x = 1",
            },
            PromptFile {
                path: "b.js",
                language: "javascript",
                content: "let y = 2;",
            },
        ];
        let p = batch_prompt(&files);
        assert!(p.contains("--- File 1: a.py (python) ---"));
        assert!(p.contains("--- File 2: b.js (javascript) ---"));
        assert!(p.find("a.py").unwrap() < p.find("b.js").unwrap());
        assert!(p.contains("JSON object"));
    }
}
