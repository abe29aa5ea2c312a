use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ebs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "EBS scripting language interpreter", long_about = None)]
pub struct Args {
    /// Script file to run.
    #[arg(value_name = "SCRIPT")]
    pub script: Option<PathBuf>,

    /// Evaluate source given on the command line instead of a file.
    #[arg(short = 'e', long = "eval", value_name = "SOURCE", conflicts_with = "script")]
    pub eval: Option<String>,

    #[arg(long = "color", value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Complete {
        #[arg(value_name = "SHELL")]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "Invalid color choice: {}. Must be 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

pub struct AppConfig {
    pub color_enabled: bool,
    pub verbose: bool,
}

impl AppConfig {
    pub fn from_args(args: &Args) -> Self {
        let color_enabled = match args.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => atty::is(atty::Stream::Stderr) && atty::is(atty::Stream::Stdout),
        };

        AppConfig {
            color_enabled,
            verbose: args.verbose,
        }
    }
}

pub fn generate_completions(shell: Shell) {
    let mut cmd = Args::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_choice_parsing() {
        assert!(matches!("auto".parse::<ColorChoice>(), Ok(ColorChoice::Auto)));
        assert!(matches!("ALWAYS".parse::<ColorChoice>(), Ok(ColorChoice::Always)));
        assert!("sometimes".parse::<ColorChoice>().is_err());
    }

    #[test]
    fn test_eval_conflicts_with_script() {
        let parsed = Args::try_parse_from(["ebs", "run.ebs", "--eval", "1;"]);
        assert!(parsed.is_err());
    }
}
