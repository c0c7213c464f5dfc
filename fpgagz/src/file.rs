//! Input and output file helpers.

use {
    crate::error::{Error, Result},
    log::debug,
    std::{
        ffi::OsString,
        fs::File,
        io::{BufReader, BufWriter, Read, Write},
        path::{Path, PathBuf},
    },
};

/// Extension appended to the input name for the compressed output.
pub const OUTPUT_EXTENSION: &str = "gz";

/// Read the whole input file into memory.
pub fn read_input<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    debug!("Loading input from: {}", path.display());

    let file_io = |source| Error::FileIo {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(file_io)?;
    let mut reader = BufReader::new(file);

    let mut data = Vec::new();
    reader
        .read_to_end(&mut data)
        .map_err(file_io)?;
    Ok(data)
}

/// Default output path: the input's base name plus `.gz`, relative to the
/// current directory.
///
/// `dir/data.bin` becomes `data.bin.gz`.
pub fn output_path<P: AsRef<Path>>(input: P) -> Result<PathBuf> {
    let input = input.as_ref();
    let Some(name) = input.file_name() else {
        return Err(Error::FileIo {
            path: input.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "input path has no file name",
            ),
        });
    };

    let mut out = OsString::from(name);
    out.push(".");
    out.push(OUTPUT_EXTENSION);
    Ok(PathBuf::from(out))
}

/// Write the compressed stream to `path`, replacing any existing file.
pub fn write_output<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    debug!("Writing {} bytes to: {}", data.len(), path.display());

    let file_io = |source| Error::FileIo {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(file_io)?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(data)
        .map_err(file_io)?;
    writer
        .flush()
        .map_err(file_io)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_uses_base_name() {
        assert_eq!(
            output_path("some/dir/data.bin").unwrap(),
            PathBuf::from("data.bin.gz")
        );
        assert_eq!(output_path("notes").unwrap(), PathBuf::from("notes.gz"));
        assert_eq!(
            output_path("archive.tar").unwrap(),
            PathBuf::from("archive.tar.gz")
        );
    }

    #[test]
    fn test_output_path_without_file_name() {
        assert!(matches!(output_path(".."), Err(Error::FileIo { .. })));
    }

    #[test]
    fn test_read_missing_input() {
        let err = read_input("/definitely/not/here.bin").unwrap_err();
        match err {
            Error::FileIo { path, source } => {
                assert_eq!(path, PathBuf::from("/definitely/not/here.bin"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            },
            other => panic!("expected FileIo, got {other:?}"),
        }
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.gz");

        write_output(&path, b"\x1f\x8bpayload").unwrap();
        assert_eq!(read_input(&path).unwrap(), b"\x1f\x8bpayload");

        // Overwrites
        write_output(&path, b"x").unwrap();
        assert_eq!(read_input(&path).unwrap(), b"x");
    }

    #[test]
    fn test_write_into_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.gz");
        assert!(matches!(
            write_output(&path, b"x"),
            Err(Error::FileIo { .. })
        ));
    }
}
