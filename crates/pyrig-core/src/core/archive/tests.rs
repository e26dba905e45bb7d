use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use flate2::{write::GzEncoder, Compression};
use pyrig_domain::ArchiveFormat;
use tar::{EntryType, Header};
use tempfile::tempdir;
use tracing::Span;

use super::*;
use crate::errors::{provision_error, ProvisionError};

enum Member<'a> {
    Dir(&'a str),
    File(&'a str, &'a [u8], u32),
    Symlink(&'a str, &'a str),
    Hardlink(&'a str, &'a str),
}

fn tar_bytes(members: &[Member<'_>]) -> Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    for member in members {
        let mut header = Header::new_gnu();
        match member {
            Member::Dir(name) => {
                header.set_entry_type(EntryType::Directory);
                header.set_mode(0o755);
                header.set_size(0);
                builder.append_data(&mut header, name, io::empty())?;
            }
            Member::File(name, data, mode) => {
                header.set_entry_type(EntryType::Regular);
                header.set_mode(*mode);
                header.set_size(data.len() as u64);
                builder.append_data(&mut header, name, *data)?;
            }
            Member::Symlink(name, target) => {
                header.set_entry_type(EntryType::Symlink);
                header.set_mode(0o777);
                header.set_size(0);
                builder.append_link(&mut header, name, target)?;
            }
            Member::Hardlink(name, target) => {
                header.set_entry_type(EntryType::Link);
                header.set_mode(0o644);
                header.set_size(0);
                builder.append_link(&mut header, name, target)?;
            }
        }
    }
    Ok(builder.into_inner()?)
}

fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

fn zstd_compress(bytes: &[u8]) -> Result<Vec<u8>> {
    Ok(zstd::stream::encode_all(bytes, 3)?)
}

fn zip_bytes(members: &[(&str, Option<&[u8]>)]) -> Result<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default().unix_permissions(0o755);
    for (name, data) in members {
        match data {
            None => writer.add_directory(*name, options)?,
            Some(data) => {
                writer.start_file(*name, options)?;
                writer.write_all(data)?;
            }
        }
    }
    Ok(writer.finish()?.into_inner())
}

fn write_archive(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, bytes)?;
    Ok(path)
}

fn extract(path: &Path, plan: &ExtractionPlan) -> Result<ExtractionSummary> {
    let format = format_for_path(path)?;
    ArchiveExtractor::new(Span::none()).extract(format, path, plan)
}

#[test]
fn gzip_tar_elides_legacy_root_folder() -> Result<()> {
    let temp = tempdir()?;
    let bytes = gzip(&tar_bytes(&[
        Member::Dir("go/"),
        Member::File("go/bin/tool", b"#!/bin/sh\necho tool\n", 0o755),
        Member::File("go/src/deep/nested/file.go", b"package nested\n", 0o644),
        Member::File("go/VERSION", b"go1.23.3\n", 0o644),
    ])?)?;
    let archive = write_archive(temp.path(), "go1.23.3.linux-amd64-abcd1234.tar.gz", &bytes)?;
    let dest = temp.path().join("go");
    let plan = ExtractionPlan::for_format(&dest, ArchiveFormat::TarGz, "");

    let summary = extract(&archive, &plan)?;
    assert_eq!(summary.written, 3);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.bytes, 44);
    assert_eq!(
        fs::read_to_string(dest.join("bin").join("tool"))?,
        "#!/bin/sh\necho tool\n"
    );
    assert!(!dest.join("go").exists());
    assert_eq!(
        fs::read_to_string(dest.join("src/deep/nested/file.go"))?,
        "package nested\n"
    );

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(dest.join("bin/tool"))?.permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
    Ok(())
}

#[test]
fn zstd_tar_applies_prefix_and_links() -> Result<()> {
    let temp = tempdir()?;
    let bytes = zstd_compress(&tar_bytes(&[
        Member::Dir("python/"),
        Member::Dir("python/install/"),
        Member::File("python/build/objs/main.o", b"object", 0o644),
        Member::File("python/install/bin/python3.13", b"interpreter", 0o755),
        Member::Symlink("python/install/bin/python3", "python3.13"),
        Member::File("python/install/lib/x.so", b"shared object", 0o755),
        Member::Hardlink("python/install/lib/x.so.1", "python/install/lib/x.so"),
        Member::File("python/PYTHON.json", b"{}", 0o644),
    ])?)?;
    let archive = write_archive(temp.path(), "cpython-3.13.0-full-1a2b3c4d.tar.zst", &bytes)?;
    let dest = temp.path().join("python-root");
    let plan = ExtractionPlan::for_format(&dest, ArchiveFormat::TarZst, "python/install");

    let summary = extract(&archive, &plan)?;
    assert_eq!(summary.written, 4);
    assert_eq!(summary.skipped, 4);
    assert_eq!(fs::read_to_string(dest.join("bin/python3.13"))?, "interpreter");
    assert!(!dest.join("objs").exists());
    assert!(!dest.join("PYTHON.json").exists());
    assert!(!dest.join("python").exists());

    let linked = dest.join("lib").join("x.so.1");
    assert_eq!(fs::read_to_string(&linked)?, "shared object");

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let original = fs::metadata(dest.join("lib").join("x.so"))?;
        let link = fs::metadata(&linked)?;
        assert_eq!(original.ino(), link.ino());
        assert_eq!(
            fs::read_link(dest.join("bin/python3"))?,
            PathBuf::from("python3.13")
        );
    }
    Ok(())
}

#[cfg(unix)]
#[test]
fn symlink_replaces_existing_directory() -> Result<()> {
    let temp = tempdir()?;
    let dest = temp.path().join("root");
    fs::create_dir_all(dest.join("bin/python3/stale"))?;
    let bytes = zstd_compress(&tar_bytes(&[
        Member::File("python/install/bin/python3.13", b"interpreter", 0o755),
        Member::Symlink("python/install/bin/python3", "python3.13"),
    ])?)?;
    let archive = write_archive(temp.path(), "cpython.tar.zst", &bytes)?;
    let plan = ExtractionPlan::for_format(&dest, ArchiveFormat::TarZst, "python/install");

    extract(&archive, &plan)?;
    let meta = fs::symlink_metadata(dest.join("bin/python3"))?;
    assert!(meta.file_type().is_symlink());
    assert_eq!(fs::read_to_string(dest.join("bin/python3"))?, "interpreter");
    Ok(())
}

#[cfg(unix)]
#[test]
fn file_replaces_existing_symlink_instead_of_writing_through_it() -> Result<()> {
    let temp = tempdir()?;
    let dest = temp.path().join("root");
    fs::create_dir_all(dest.join("bin"))?;
    let outside = temp.path().join("outside.txt");
    fs::write(&outside, "keep me")?;
    std::os::unix::fs::symlink(&outside, dest.join("bin/tool"))?;

    let bytes = gzip(&tar_bytes(&[Member::File("go/bin/tool", b"fresh", 0o755)])?)?;
    let archive = write_archive(temp.path(), "tool.tar.gz", &bytes)?;
    extract(
        &archive,
        &ExtractionPlan::for_format(&dest, ArchiveFormat::TarGz, ""),
    )?;

    assert_eq!(fs::read_to_string(&outside)?, "keep me");
    assert_eq!(fs::read_to_string(dest.join("bin/tool"))?, "fresh");
    Ok(())
}

#[test]
fn zip_elides_legacy_root_folder() -> Result<()> {
    let temp = tempdir()?;
    let bytes = zip_bytes(&[
        ("go/", None),
        ("go/bin/", None),
        ("go/bin/go.exe", Some(&b"MZ"[..])),
        ("tiny-pkg-config.exe", Some(&b"MZ-helper"[..])),
    ])?;
    let archive = write_archive(temp.path(), "go1.23.3.windows-amd64-00ff00ff.zip", &bytes)?;
    let dest = temp.path().join("go");
    let plan = ExtractionPlan::for_format(&dest, ArchiveFormat::Zip, "");

    let summary = extract(&archive, &plan)?;
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.bytes, 11);
    assert_eq!(fs::read(dest.join("bin").join("go.exe"))?, b"MZ");
    assert_eq!(fs::read(dest.join("tiny-pkg-config.exe"))?, b"MZ-helper");
    assert!(!dest.join("go").exists());
    Ok(())
}

#[test]
fn unknown_extension_is_rejected() {
    let err = format_for_path(Path::new("/cache/python-3.13.tar.bz2")).unwrap_err();
    assert!(matches!(
        provision_error(&err),
        Some(ProvisionError::UnsupportedArchive { .. })
    ));
}

#[test]
fn traversal_entries_are_rejected() -> Result<()> {
    let temp = tempdir()?;
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = Header::new_old();
    let name = b"go/../../escape.txt";
    header.as_old_mut().name[..name.len()].copy_from_slice(name);
    header.set_entry_type(EntryType::Regular);
    header.set_mode(0o644);
    header.set_size(4);
    header.set_cksum();
    builder.append(&header, &b"evil"[..])?;
    let bytes = gzip(&builder.into_inner()?)?;
    let archive = write_archive(temp.path(), "evil.tar.gz", &bytes)?;
    let dest = temp.path().join("dest");

    let err = extract(
        &archive,
        &ExtractionPlan::for_format(&dest, ArchiveFormat::TarGz, ""),
    )
    .unwrap_err();
    assert!(matches!(
        provision_error(&err),
        Some(ProvisionError::ArchiveCorrupt { .. })
    ));
    assert!(!temp.path().join("escape.txt").exists());
    Ok(())
}

#[test]
fn corrupt_stream_reports_archive_path() -> Result<()> {
    let temp = tempdir()?;
    let archive = write_archive(temp.path(), "broken.tar.zst", b"definitely not zstd")?;
    let err = extract(&archive, &ExtractionPlan::new(temp.path().join("dest"))).unwrap_err();
    match provision_error(&err) {
        Some(ProvisionError::ArchiveCorrupt { archive: path, .. }) => assert_eq!(path, &archive),
        other => panic!("expected corrupt archive error, got {other:?}"),
    }
    Ok(())
}
