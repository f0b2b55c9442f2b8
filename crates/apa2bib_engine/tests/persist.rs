use std::fs;

use apa2bib_engine::BibFileWriter;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn append_creates_file_and_parent_dir() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("refs").join("library.bib");

    BibFileWriter::new(&path).append("@book{doe2021}\n").unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "@book{doe2021}\n");
}

#[test]
fn entries_are_separated_by_blank_line() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("library.bib");
    let writer = BibFileWriter::new(&path);

    writer.append("@book{doe2021}").unwrap();
    writer.append("  @article{smith2020}  ").unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "@book{doe2021}\n\n@article{smith2020}\n"
    );
}

#[test]
fn directory_target_is_rejected() {
    let temp = TempDir::new().unwrap();
    let writer = BibFileWriter::new(temp.path());

    assert!(writer.append("@misc{x}").is_err());
}
