use super::*;

#[test]
fn expand_home_tilde_slash() {
    let result = expand_home("~/trips/config.json");
    let home = dirs::home_dir().unwrap();
    assert_eq!(result, home.join("trips/config.json"));
}

#[test]
fn expand_home_tilde_only() {
    let result = expand_home("~");
    let home = dirs::home_dir().unwrap();
    assert_eq!(result, home);
}

#[test]
fn expand_home_relative() {
    let result = expand_home("relative/path");
    assert_eq!(result, PathBuf::from("relative/path"));
}

#[test]
fn ensure_dir_creates_and_returns() {
    let tmp = tempfile::tempdir().unwrap();
    let new_dir = tmp.path().join("subdir");
    let result = ensure_dir(&new_dir).unwrap();
    assert_eq!(result, new_dir);
    assert!(new_dir.exists());
}

#[test]
fn atomic_write_creates_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("test.txt");
    atomic_write(&path, "hello").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
}

#[test]
fn atomic_write_overwrites() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("test.txt");
    atomic_write(&path, "first").unwrap();
    atomic_write(&path, "second").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
}

#[test]
fn mime_from_known_extensions() {
    assert_eq!(mime_from_path(Path::new("ticket.PDF")), "application/pdf");
    assert_eq!(mime_from_path(Path::new("beach.jpeg")), "image/jpeg");
    assert_eq!(mime_from_path(Path::new("notes.txt")), "text/plain");
}

#[test]
fn mime_from_unknown_extension_falls_back() {
    assert_eq!(
        mime_from_path(Path::new("archive.xyz")),
        "application/octet-stream"
    );
    assert_eq!(mime_from_path(Path::new("README")), "application/octet-stream");
}
