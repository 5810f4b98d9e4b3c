//! Terminal presentation: banner, usage hint and fatal errors.
//!
//! Everything here is cosmetic. `console` drops the colors on its own when
//! the stream is not a terminal.

use console::style;

const BANNER: &str = r"
 _       _   _           _ _
| |_ ___| |_| |_ ___ ___|_| |___
|   | .'| '_|  _|  _| .'| | |_ -|
|_|_|__,|_,_|_| |_| |__,|_|_|___|
";

/// One row of the usage hint: what it does, how to call it.
const HINT_ROWS: &[(&str, &str)] = &[
    ("Subdomains", "cat domains.txt | haktrails subdomains"),
    ("Associated domains", "cat domains.txt | haktrails associateddomains"),
    ("Associated ips", "cat domains.txt | haktrails associatedips"),
    ("Associated company", "cat domains.txt | haktrails company"),
    (
        "Historical DNS data",
        "cat domains.txt | haktrails historicaldns --type <lookuptype>",
    ),
    ("Historical whois data", "cat domains.txt | haktrails historicalwhois"),
    ("Domain details", "cat domains.txt | haktrails details"),
    ("Domain tags", "cat domains.txt | haktrails tags"),
    ("Whois data", "cat domains.txt | haktrails whois"),
    ("Submit hostnames", "cat hostnames.txt | haktrails submit -b 100"),
    ("DSL query", "haktrails dsl --query \"query here\""),
    ("SecurityTrails usage", "haktrails usage"),
    ("Check API Key", "haktrails ping"),
    ("Show the banner", "haktrails banner"),
];

/// The usage hint as plain text.
pub fn hint_text() -> String {
    let width = HINT_ROWS
        .iter()
        .map(|(label, _)| label.len())
        .max()
        .unwrap_or(0)
        + 2;

    let mut text = String::from("Usage incorrect. Hint:\n\n");
    for (label, example) in HINT_ROWS {
        let label = format!("{}:", label);
        text.push_str(&format!("    {:<width$}{}\n", label, example, width = width));
    }
    text.push_str("\nGlobal options: -t <threads> -b <batch size> -c <config> -o list|json --timeout <dur>\n");
    text.push_str("Run `haktrails --help` for the full option list.\n");
    text
}

/// Print the usage hint in yellow.
pub fn print_hint() {
    println!("{}", style(hint_text()).yellow());
}

/// Print the banner in green.
pub fn print_banner() {
    println!(
        "{}\n   {}\n",
        style(BANNER).green(),
        style(format!("haktrails v{}", env!("CARGO_PKG_VERSION"))).green()
    );
}

/// Print a fatal error in red on stderr.
pub fn print_fatal(message: &str) {
    eprintln!("{}", style(format!("Error: {}", message)).red());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_lists_every_command() {
        let hint = hint_text();
        for command in [
            "subdomains",
            "associateddomains",
            "associatedips",
            "company",
            "historicaldns",
            "historicalwhois",
            "details",
            "tags",
            "whois",
            "submit",
            "dsl",
            "usage",
            "ping",
            "banner",
        ] {
            assert!(
                hint.contains(&format!("haktrails {}", command)),
                "hint is missing {}",
                command
            );
        }
    }

    #[test]
    fn test_hint_columns_are_aligned() {
        let hint = hint_text();
        let columns: Vec<usize> = hint
            .lines()
            .filter(|line| line.starts_with("    "))
            .filter_map(|line| {
                let after_label = line.find(':')? + 1;
                let padding = line[after_label..].chars().take_while(|c| *c == ' ').count();
                Some(after_label + padding)
            })
            .collect();
        assert_eq!(columns.len(), HINT_ROWS.len());
        assert!(columns.iter().all(|&c| c == columns[0]));
    }
}
