use crate::{Error, MotionDocument};
use std::io::{BufWriter, Write};
use std::path::Path;

impl MotionDocument {
    /// Writes the verbatim hierarchy followed by the current motion table.
    ///
    /// Values use Rust's shortest round-trip float formatting, so reading the output back yields
    /// identical `f64`s.
    pub fn write_to<W: Write>(&self, mut out: W) -> Result<(), Error> {
        if !self.is_load_success || self.header.is_empty() {
            return Err(Error::NotLoaded);
        }
        let io = |source| Error::Write { source };

        out.write_all(self.header.as_bytes()).map_err(io)?;
        if !self.header.ends_with('\n') {
            out.write_all(b"\n").map_err(io)?;
        }
        writeln!(out, "MOTION").map_err(io)?;
        writeln!(out, "Frames: {}", self.num_frames).map_err(io)?;
        writeln!(out, "Frame Time: {}", self.interval).map_err(io)?;

        for frame in 0..self.num_frames {
            let Some(row) = self.frame(frame) else {
                break;
            };
            let mut first = true;
            for value in row {
                if !first {
                    out.write_all(b" ").map_err(io)?;
                }
                write!(out, "{value}").map_err(io)?;
                first = false;
            }
            out.write_all(b"\n").map_err(io)?;
        }
        out.flush().map_err(io)
    }

    pub fn to_bvh_string(&self) -> Result<String, Error> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        String::from_utf8(bytes).map_err(|err| Error::InvalidValue {
            message: err.to_string(),
        })
    }

    /// Saves to `path`, creating or truncating the file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.write_to(BufWriter::new(file))?;
        log::debug!("saved {} frame(s) to '{}'", self.num_frames, path.display());
        Ok(())
    }
}
