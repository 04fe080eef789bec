// Keyword heuristics over code and free text

/// Coarse pattern tags found in a code snippet
pub fn extract_patterns(code: &str) -> Vec<String> {
    let lower = code.to_lowercase();
    let mut patterns = Vec::new();

    let python_errors = code.contains("try:") && code.contains("except");
    let rust_errors = code.contains("match ") && code.contains("Err(");
    if python_errors || rust_errors {
        patterns.push("error_handling");
    }
    if code.contains("redis.get") || lower.contains("cache") {
        patterns.push("caching");
    }
    if lower.contains("log") {
        patterns.push("logging");
    }
    if code.contains("def ") || code.contains("fn ") {
        patterns.push("function_definition");
    }
    if code.contains("import ") || code.contains("use ") {
        patterns.push("module_import");
    }

    patterns.into_iter().map(String::from).collect()
}

/// Which family member a piece of text is most likely about
pub fn guess_component(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if mentions(&["nyala", "trading", "market"]) {
        "nyala"
    } else if mentions(&["deon", "risk", "portfolio"]) {
        "deon"
    } else if mentions(&["claudae", "system", "monitor"]) {
        "claudae"
    } else {
        "general"
    }
}
