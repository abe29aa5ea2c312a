mod common;

use common::ScriptDir;
use ebs::interpreter::Outcome;
use ebs::Value;

fn completed(outcome: Outcome) -> Value {
    match outcome {
        Outcome::Completed(value) => value,
        other => panic!("expected completion, got {:?}", other),
    }
}

#[test]
fn test_imported_functions_become_callable() {
    let dir = ScriptDir::new("callable");
    dir.write("lib.ebs", "function triple(n) { return n * 3; }\n");
    dir.write("main.ebs", "import \"lib.ebs\";\ntriple(7);");
    assert_eq!(completed(dir.run("main.ebs")), Value::Int(21));
}

#[test]
fn test_import_is_idempotent() {
    let dir = ScriptDir::new("idempotent");
    dir.write("lib.ebs", "function once() { return 1; }\n");
    dir.write(
        "main.ebs",
        "import \"lib.ebs\";\nimport \"lib.ebs\";\nimport \"./lib.ebs\";\nonce();",
    );
    assert_eq!(completed(dir.run("main.ebs")), Value::Int(1));
}

#[test]
fn test_repeated_imports_run_top_level_statements_once() {
    // The lib's top level mutates importing-scope state, so running it a
    // second time would be observable.
    let dir = ScriptDir::new("once");
    dir.write("lib.ebs", "count = count + 1;\n");
    dir.write(
        "main.ebs",
        "var count = 0;\nimport \"lib.ebs\";\nimport \"lib.ebs\";\nimport \"./lib.ebs\";\ncount;",
    );
    assert_eq!(completed(dir.run("main.ebs")), Value::Int(1));
}

#[test]
fn test_import_cycle_terminates() {
    let dir = ScriptDir::new("cycle");
    dir.write("a.ebs", "import \"b.ebs\";\nfunction from_a() { return \"a\"; }\n");
    dir.write("b.ebs", "import \"a.ebs\";\nfunction from_b() { return \"b\"; }\n");
    dir.write("main.ebs", "import \"a.ebs\";\nfrom_a() + from_b();");
    assert_eq!(completed(dir.run("main.ebs")), Value::string("ab"));
}

#[test]
fn test_nested_imports_resolve_against_their_own_directory() {
    let dir = ScriptDir::new("nested");
    std::fs::create_dir_all(dir.0.join("sub")).unwrap();
    dir.write("sub/inner.ebs", "function deep() { return 9; }\n");
    dir.write("sub/outer.ebs", "import \"inner.ebs\";\n");
    dir.write("main.ebs", "import \"sub/outer.ebs\";\ndeep();");
    assert_eq!(completed(dir.run("main.ebs")), Value::Int(9));
}

#[test]
fn test_missing_import_is_io_error() {
    let dir = ScriptDir::new("missing");
    dir.write("main.ebs", "import \"nowhere.ebs\";");
    match dir.run("main.ebs") {
        Outcome::Raised { kind, line, .. } => {
            assert_eq!(kind, "IO_ERROR");
            assert_eq!(line, 1);
        }
        other => panic!("expected a raise, got {:?}", other),
    }
}

#[test]
fn test_unparsable_import_is_parse_error() {
    let dir = ScriptDir::new("badimport");
    dir.write("broken.ebs", "var = ;\n");
    dir.write("main.ebs", "import \"broken.ebs\";");
    match dir.run("main.ebs") {
        Outcome::Raised { kind, message, .. } => {
            assert_eq!(kind, "PARSE_ERROR");
            assert!(message.contains("broken.ebs"));
        }
        other => panic!("expected a raise, got {:?}", other),
    }
}

#[test]
fn test_conflicting_declaration_across_imports() {
    let dir = ScriptDir::new("conflict");
    dir.write("one.ebs", "function shared() { return 1; }\n");
    dir.write("two.ebs", "function shared() { return 2; }\n");
    dir.write("main.ebs", "import \"one.ebs\";\nimport \"two.ebs\";");
    match dir.run("main.ebs") {
        Outcome::Raised { kind, message, .. } => {
            assert_eq!(kind, "VALIDATION_ERROR");
            assert!(message.contains("shared"));
        }
        other => panic!("expected a raise, got {:?}", other),
    }
}

#[test]
fn test_first_import_wins_for_registration() {
    // one.ebs was registered first, so re-importing it through a different
    // path never re-executes and never re-declares.
    let dir = ScriptDir::new("firstwins");
    dir.write("one.ebs", "function tag() { return \"first\"; }\n");
    dir.write("relay.ebs", "import \"one.ebs\";\n");
    dir.write("main.ebs", "import \"one.ebs\";\nimport \"relay.ebs\";\ntag();");
    assert_eq!(completed(dir.run("main.ebs")), Value::string("first"));
}

#[test]
fn test_imported_aliases_are_visible() {
    let dir = ScriptDir::new("aliases");
    dir.write("shapes.ebs", "point typeof record { x: int, y: int };\n");
    dir.write(
        "main.ebs",
        "import \"shapes.ebs\";\nvar p = cast({\"x\": 1, \"y\": 2}, point);\np.y;",
    );
    assert_eq!(completed(dir.run("main.ebs")), Value::Int(2));
}

#[test]
fn test_importing_the_entry_script_is_a_no_op() {
    let dir = ScriptDir::new("selfimport");
    dir.write("lib.ebs", "import \"main.ebs\";\nfunction lift() { return 4; }\n");
    dir.write("main.ebs", "import \"lib.ebs\";\nlift();");
    assert_eq!(completed(dir.run("main.ebs")), Value::Int(4));
}
