use drivefs_core::domain::{NodeStat, VirtualPath};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
    /// One directory entry living at `path`
    fn entry(&self, path: &VirtualPath, stat: &NodeStat);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {
        // Human formatter doesn't print JSON
    }
    fn entry(&self, path: &VirtualPath, stat: &NodeStat) {
        println!("{}", entry_line(path, stat));
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"level": "warning", "message": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
    fn entry(&self, path: &VirtualPath, stat: &NodeStat) {
        println!("{}", entry_json(path, stat));
    }
}

pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(HumanFormatter)
    }
}

/// `d`/`-` marker, size, modification time, name and path
pub fn entry_line(path: &VirtualPath, stat: &NodeStat) -> String {
    let kind = if stat.is_dir() { 'd' } else { '-' };
    let lock = if stat.locked { 'L' } else { ' ' };
    let size = stat
        .size
        .map(format_size)
        .unwrap_or_else(|| "-".to_string());
    let modified = stat
        .modified
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!("{kind}{lock} {size:>9}  {modified:<16}  {}  {path}", stat.name)
}

pub fn entry_json(path: &VirtualPath, stat: &NodeStat) -> serde_json::Value {
    let mut value = serde_json::to_value(stat).unwrap_or_default();
    if let Some(obj) = value.as_object_mut() {
        obj.insert("path".into(), path.as_str().into());
    }
    value
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
