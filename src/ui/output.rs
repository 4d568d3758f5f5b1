use crate::ui::{Icons, theme};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::DATABASE, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn info(label: &str, value: &str) {
    println!("{} {}: {}", Icons::INFO, label.style(theme().dim.clone()), value);
}

/// One `key → value` line
pub fn pair(key: &str, value: &str) {
    println!(
        "{} {} {} {}",
        Icons::KEY,
        key.style(theme().key.clone()),
        "→".style(theme().dim.clone()),
        value.style(theme().value.clone())
    );
}

pub fn not_found(what: &str) {
    println!("{} {}", Icons::EMPTY.style(theme().dim.clone()), format!("{} not found", what).style(theme().dim.clone()));
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}
