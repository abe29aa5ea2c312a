use clap::Parser;
use owo_colors::OwoColorize;

use ebs::cli::{generate_completions, AppConfig, Args, Commands};
use ebs::diagnostic::{Diagnostic, DiagnosticRenderer, Label, Span};
use ebs::interpreter::{Interpreter, Outcome, Session};

fn main() {
    let args = Args::parse();

    if let Some(Commands::Complete { shell }) = args.command {
        generate_completions(shell);
        return;
    }

    let config = AppConfig::from_args(&args);

    let session = Session::new();
    session.set_verbose(config.verbose);
    let mut interpreter = Interpreter::new(session);

    let (outcome, source, name) = if let Some(source) = &args.eval {
        verbose_log(&config, "Evaluating command-line source");
        (
            interpreter.run_source("<eval>", source),
            source.clone(),
            "<eval>".to_string(),
        )
    } else if let Some(script) = &args.script {
        verbose_log(&config, &format!("Running {}", script.display()));
        let source = std::fs::read_to_string(script).unwrap_or_default();
        let name = script.display().to_string();
        (interpreter.run_file(script), source, name)
    } else {
        error_message(&config, "No script given. Provide a SCRIPT path or --eval.");
        std::process::exit(1);
    };

    match outcome {
        Outcome::Completed(_) => {
            verbose_log(&config, "Script completed");
        }
        Outcome::ParseFailed { message, line } => {
            let diagnostic = Diagnostic::error(&message)
                .with_label(Label::primary(line_span(&source, line), "here"));
            let renderer = DiagnosticRenderer::new(&source, &name, config.color_enabled);
            eprint!("{}", renderer.render(&diagnostic));
            std::process::exit(2);
        }
        Outcome::Raised {
            kind,
            message,
            line,
        } => {
            error_message(&config, &format!("{}: {} (line {})", kind, message, line));
            std::process::exit(1);
        }
    }
}

/// Span of the first non-blank stretch of a 1-based source line, for
/// pointing a diagnostic at a line when no exact span survived.
fn line_span(source: &str, line: u32) -> Span {
    let mut offset = 0usize;
    for (i, text) in source.split('\n').enumerate() {
        if (i + 1) as u32 == line {
            let trimmed = text.trim_start();
            let start = offset + (text.len() - trimmed.len());
            let end = start + trimmed.trim_end().len().max(1);
            return Span::new(start, end);
        }
        offset += text.len() + 1;
    }
    Span::dummy()
}

fn verbose_log(config: &AppConfig, message: &str) {
    if config.verbose {
        eprintln!("[ebs:debug] {}", message);
    }
}

fn error_message(config: &AppConfig, message: &str) {
    if config.color_enabled {
        eprintln!("{}", message.red().bold());
    } else {
        eprintln!("{}", message);
    }
}
