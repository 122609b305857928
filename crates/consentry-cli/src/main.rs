use std::process;

fn main() {
    process::exit(consentry_cli::run());
}
