use std::{fs, path::Path};

use tempfile::TempDir;
use weft_syntax::{Module, NoExports, StaticExports, Symbol, screen};

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_screen_accepts_declared_extension() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "models.py",
        "from weft import ext\n\nclass Models(ext.Extension):\n    suffix = '.json'\n",
    );

    assert!(screen(&path, &Symbol::new("weft.ext.Extension"), &NoExports));
}

#[test]
fn test_screen_prechecks() {
    let dir = TempDir::new().unwrap();
    let body = "from weft.ext import Extension\nclass A(Extension): pass\n";
    let base = Symbol::new("weft.ext.Extension");

    let private = write(dir.path(), "_helpers.py", body);
    let text = write(dir.path(), "notes.txt", body);
    let plain = write(dir.path(), "plain.py", body);

    assert!(!screen(&private, &base, &NoExports));
    assert!(!screen(&text, &base, &NoExports));
    assert!(screen(&plain, &base, &NoExports));
}

#[test]
fn test_screen_rejects_broken_files() {
    let dir = TempDir::new().unwrap();
    let base = Symbol::new("weft.ext.Extension");

    let syntax = write(
        dir.path(),
        "broken.py",
        "from weft.ext import Extension\nclass A(Extension:\n    pass\n",
    );
    let binary = dir.path().join("binary.py");
    fs::write(&binary, [0xff, 0xfe, 0x00]).unwrap();
    let missing = dir.path().join("missing.py");

    assert!(!screen(&syntax, &base, &NoExports));
    assert!(!screen(&binary, &base, &NoExports));
    assert!(!screen(&missing, &base, &NoExports));
}

#[test]
fn test_syntax_error_is_located() {
    let err = Module::parse_named("class A(B:\n    pass\n", "broken.py").unwrap_err();
    assert!(err.is_syntax());

    match *err {
        weft_syntax::Error::Syntax { src, span, .. } => {
            assert_eq!(src.name(), "broken.py");
            assert_eq!(span.offset(), 7);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_screen_uses_package_exports() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "short.py",
        "from weft import Extension\nclass Short(Extension): pass\n",
    );
    let base = Symbol::new("weft.ext.Extension");

    assert!(!screen(&path, &base, &NoExports));
    assert!(screen(
        &path,
        &base,
        &StaticExports::new().package("weft", ["Extension"])
    ));
}

#[test]
fn test_screen_rejects_errors_below_top_level() {
    let dir = TempDir::new().unwrap();
    let base = Symbol::new("weft.Extension");

    let method = write(
        dir.path(),
        "method.py",
        concat!(
            "from weft import Extension\n",
            "class Broken(Extension):\n",
            "    def render(self):\n",
            "        return 1 +\n",
        ),
    );
    let statement = write(
        dir.path(),
        "statement.py",
        "from weft import Extension\nclass Broken(Extension): pass\nx = = 1\n",
    );
    let valid = write(
        dir.path(),
        "valid.py",
        concat!(
            "from weft import Extension\n",
            "class Fine(Extension):\n",
            "    def render(self):\n",
            "        return 1 + 2\n",
        ),
    );

    assert!(!screen(&method, &base, &NoExports));
    assert!(!screen(&statement, &base, &NoExports));
    assert!(screen(&valid, &base, &NoExports));

    let err = Module::load(&method).unwrap_err();
    assert!(err.is_syntax());
}
