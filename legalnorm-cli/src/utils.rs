use colored::*;

pub fn print_banner() {
    println!(
        "{}",
        r#"
 __                  __ _   __
/ /  ___ ___ ____ _ / /(_) / /  ___  ____ _ _
/ /__/ -_) _ `/ _ `// // / _ \ \/ _ \/ __/ '_ \
\____/\__/\_, / \_,_//_//_//_.__/_//_/\_,_/_/ /_/
           /_/
"#
        .cyan()
        .bold()
    );
    println!("{}", "Federated retrieval and enrichment engine for Italian and EU legal norms".green());
    println!("{}", "Version 1.0.0\n".yellow());
}

pub fn print_success(message: &str) {
    println!("{} {}", "✅".green(), message);
}

pub fn print_error(message: &str) {
    println!("{} {}", "❌".red(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠️".yellow(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ️".blue(), message);
}
