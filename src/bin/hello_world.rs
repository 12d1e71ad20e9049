//! `hello-world`: the smallest possible CLI.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "hello-world", version = "v1.0.0")]
#[command(about = "Hello World CLI", long_about = None)]
struct Cli {
    text: String,

    #[arg(long, short = 'b')]
    bold: bool,
}

fn greeting(cli: &Cli) -> String {
    let weight = if cli.bold { "bold" } else { "normal" };
    format!("Hello World {} {}", cli.text, weight)
}

fn main() {
    let cli = Cli::parse();
    println!("{}", greeting(&cli));
}
