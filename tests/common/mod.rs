use std::io::Write;
use std::path::PathBuf;

use ebs::interpreter::{Interpreter, Outcome, Session};
use ebs::Value;

pub fn run(source: &str) -> Outcome {
    let mut interpreter = Interpreter::new(Session::new());
    interpreter.run_source("test.ebs", source)
}

/// Runs a script and returns the value of its last expression statement.
pub fn completed(source: &str) -> Value {
    match run(source) {
        Outcome::Completed(value) => value,
        other => panic!("expected completion, got {:?}", other),
    }
}

/// Runs a script expected to end with an uncaught exception.
pub fn raised(source: &str) -> (String, String, u32) {
    match run(source) {
        Outcome::Raised {
            kind,
            message,
            line,
        } => (kind, message, line),
        other => panic!("expected a raise, got {:?}", other),
    }
}

/// A scratch directory for scripts that import each other; removed on drop.
pub struct ScriptDir(pub PathBuf);

impl ScriptDir {
    pub fn new(tag: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("ebs-test-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        ScriptDir(dir)
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.0.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    pub fn run(&self, name: &str) -> Outcome {
        let mut interpreter = Interpreter::new(Session::new());
        interpreter.run_file(&self.0.join(name))
    }
}

impl Drop for ScriptDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}
