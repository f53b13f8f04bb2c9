//! Unit tests for the audit loop.

use std::fs;
use std::io::Cursor;
use std::os::unix::fs::MetadataExt;

use mockall::mock;
use mockall::predicate::eq;
use rstest::{fixture, rstest};
use tempfile::TempDir;
use worm_protocol::{FailureKind, ObjectHandle, ResponseRecord, WormFields};

use super::*;

mock! {
    Source {}
    impl ResponseSource for Source {
        fn query(&mut self, handle: ObjectHandle) -> Result<ResponseRecord, CoprocessError>;
    }
}

struct Tree {
    dir: TempDir,
}

impl Tree {
    fn file(&self, name: &str) -> (String, u64) {
        let path = self.dir.path().join(name);
        fs::write(&path, b"retained").expect("write file");
        let ino = fs::symlink_metadata(&path).expect("stat").ino();
        (path.display().to_string(), ino)
    }

    fn subdir(&self, name: &str) -> String {
        let path = self.dir.path().join(name);
        fs::create_dir(&path).expect("create dir");
        path.display().to_string()
    }
}

#[fixture]
fn tree() -> Tree {
    Tree {
        dir: TempDir::new().expect("temp dir"),
    }
}

fn committed() -> ResponseRecord {
    ResponseRecord::success(
        1_000,
        WormFields {
            committed: 1,
            retention_date: 5_000,
            ..WormFields::default()
        },
    )
}

fn run(source: MockSource, input: &str) -> (Result<AuditSummary, AuditError>, String) {
    let mut output = Vec::new();
    let mut session = AuditSession::new(source, &mut output);
    let result = session.audit(&mut Cursor::new(input.as_bytes().to_vec()));
    drop(session);
    (result, String::from_utf8(output).expect("utf-8 output"))
}

#[rstest]
fn writes_one_line_per_file(tree: Tree) {
    let (first, first_ino) = tree.file("a");
    let (second, second_ino) = tree.file("b");
    let mut source = MockSource::new();
    source
        .expect_query()
        .with(eq(ObjectHandle::new(first_ino)))
        .times(1)
        .returning(|_| Ok(committed()));
    source
        .expect_query()
        .with(eq(ObjectHandle::new(second_ino)))
        .times(1)
        .returning(|_| Ok(ResponseRecord::failure(FailureKind::NotAWormObject, 0)));

    let (result, output) = run(source, &format!("{first}\n{second}\n"));
    let summary = result.expect("audit");
    assert_eq!(summary.files, 2);
    assert_eq!(summary.lookup_errors, 1);
    assert_eq!(summary.skipped, 0);

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.first().is_some_and(|line| line.starts_with("E,C,1000,")));
    assert!(lines.first().is_some_and(|line| line.ends_with(&format!(",\"{first}\""))));
    assert!(lines.get(1).is_some_and(|line| line.starts_with("-,-5,")));
}

#[rstest]
fn directories_and_missing_paths_are_skipped(tree: Tree) {
    let directory = tree.subdir("sub");
    let missing = tree.dir.path().join("gone").display().to_string();
    let mut source = MockSource::new();
    source.expect_query().never();

    let (result, output) = run(source, &format!("{directory}\n\n{missing}\n"));
    let summary = result.expect("audit");
    assert_eq!(summary.files, 0);
    assert_eq!(summary.skipped, 2);
    assert!(output.is_empty());
}

#[rstest]
fn filter_failure_stops_the_audit(tree: Tree) {
    let (path, _) = tree.file("a");
    let mut source = MockSource::new();
    source
        .expect_query()
        .times(1)
        .returning(|handle| Err(CoprocessError::Closed { handle }));

    let (result, _) = run(source, &format!("{path}\n{path}\n"));
    assert!(matches!(
        result,
        Err(AuditError::Coprocess(CoprocessError::Closed { .. }))
    ));
}

#[rstest]
#[case::newline(b"/ifs/a\n".as_slice(), Some("/ifs/a"))]
#[case::crlf(b"/ifs/a\r\n".as_slice(), Some("/ifs/a"))]
#[case::unterminated(b"/ifs/a".as_slice(), Some("/ifs/a"))]
#[case::blank(b"\n".as_slice(), None)]
fn lines_map_to_paths(#[case] line: &[u8], #[case] expected: Option<&str>) {
    assert_eq!(path_from_line(line), expected.map(Path::new));
}
