use std::{cell::RefCell, fmt::Write, fs::File, io, path::PathBuf, rc::Rc};

// For convenience, when trying to create
// mutable shared pointers, for single-threaded use.
pub type RcRefCell<T> = Rc<RefCell<T>>;

pub fn rc_refcell<T>(t: T) -> RcRefCell<T> {
    Rc::new(RefCell::new(t))
}

pub struct StringBuffer {
    s: String,
}

impl StringBuffer {
    pub fn new() -> StringBuffer {
        StringBuffer { s: String::new() }
    }

    pub fn as_str(&self) -> &str {
        self.s.as_str()
    }

    pub fn clear(&mut self) {
        self.s = String::new();
    }
}

impl Default for StringBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// String only implements fmt::Write
impl io::Write for StringBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let str_rep = std::str::from_utf8(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        match self.s.write_str(str_rep) {
            Ok(_) => Ok(buf.len()),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// A shared stream writer, so the dialog and the report renderer can
// write either to stdout or to a buffer that tests inspect afterwards.
#[derive(Clone)]
pub struct WriteHandle {
    w: RcRefCell<dyn io::Write>,
}

impl WriteHandle {
    pub fn stdout_write_handle() -> WriteHandle {
        WriteHandle { w: rc_refcell(io::stdout()) }
    }

    pub fn stderr_write_handle() -> WriteHandle {
        WriteHandle { w: rc_refcell(io::stderr()) }
    }

    pub fn string_buff_write_handle() -> (WriteHandle, RcRefCell<StringBuffer>) {
        let buffer = rc_refcell(StringBuffer::new());
        let h = WriteHandle { w: buffer.clone() };
        (h, buffer)
    }

    pub fn empty_write_handle() -> WriteHandle {
        WriteHandle { w: rc_refcell(io::empty()) }
    }
}

impl io::Write for WriteHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.w.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.w.borrow_mut().flush()
    }
}

// A report that has either been opened from a path, or was handed to
// us already in memory. Keeps the name along with it for messages.
pub enum DescribedReader {
    String((String, String)),
    FilePath(PathBuf),
}

impl DescribedReader {
    pub fn from_string(desc: String, data: String) -> DescribedReader {
        DescribedReader::String((desc, data))
    }

    pub fn from_file_path(path: PathBuf) -> DescribedReader {
        DescribedReader::FilePath(path)
    }

    pub fn desc(&self) -> &str {
        match self {
            DescribedReader::String((name, _)) => name,
            DescribedReader::FilePath(path) => {
                path.to_str().unwrap_or("<unknown path>")
            }
        }
    }

    pub fn reader<'a>(&'a self) -> Result<Box<dyn io::Read + 'a>, io::Error> {
        match self {
            DescribedReader::String((_, text)) => {
                Ok(Box::new(io::Cursor::new(text.as_bytes())))
            }
            DescribedReader::FilePath(path) => Ok(Box::new(File::open(path)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::{DescribedReader, StringBuffer, WriteHandle};

    #[test]
    fn test_string_buffer() {
        let mut buff = StringBuffer::new();
        let _ = write!(buff, "Some {}", "text");
        let _ = writeln!(buff, " 1");
        assert_eq!(buff.as_str(), "Some text 1\n");
        buff.clear();
        assert_eq!(buff.as_str(), "");
    }

    #[test]
    fn test_write_handle() {
        let (mut handle, buff) = WriteHandle::string_buff_write_handle();
        let _ = write!(handle, "Some {}", "text");
        let mut other = handle.clone();
        let _ = writeln!(other, " 1");
        assert_eq!(buff.borrow().as_str(), "Some text 1\n");
    }

    #[test]
    fn test_described_reader() {
        let dr = DescribedReader::from_string("gains.tsv".to_string(), "a\tb\n".to_string());
        assert_eq!(dr.desc(), "gains.tsv");
        let mut s = String::new();
        dr.reader().unwrap().read_to_string(&mut s).unwrap();
        assert_eq!(s, "a\tb\n");

        let missing = DescribedReader::from_file_path("/nonexistent/gains.tsv".into());
        assert!(missing.reader().is_err());
    }
}
