use crate::redactor::PiiRedactor;
use std::io;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

/// `MakeWriter` wrapper that scrubs each formatted event before it reaches the sink
///
/// The fmt layer renders a whole event into one buffer and writes it in a
/// single call, so redaction always sees complete lines.
#[derive(Clone)]
pub struct RedactingMakeWriter<M> {
    inner: M,
    redactor: Option<Arc<PiiRedactor>>,
}

impl<M> RedactingMakeWriter<M> {
    pub fn new(inner: M, redactor: Option<Arc<PiiRedactor>>) -> Self {
        Self { inner, redactor }
    }
}

impl<'a, M> MakeWriter<'a> for RedactingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = RedactingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: self.inner.make_writer(),
            redactor: self.redactor.clone(),
        }
    }
}

pub struct RedactingWriter<W> {
    inner: W,
    redactor: Option<Arc<PiiRedactor>>,
}

impl<W: io::Write> io::Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &self.redactor {
            Some(redactor) => {
                let redacted = redactor.redact(&String::from_utf8_lossy(buf));
                self.inner.write_all(redacted.as_bytes())?;
                Ok(buf.len())
            }
            None => self.inner.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writer_redacts_lines() {
        let sink = Captured::default();
        let make = RedactingMakeWriter::new(
            {
                let sink = sink.clone();
                move || sink.clone()
            },
            Some(Arc::new(PiiRedactor::default())),
        );

        let mut writer = make.make_writer();
        writer.write_all(b"receipt sent to paz@mail.com\n").unwrap();

        let written = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "receipt sent to p***@m***\n");
    }

    #[test]
    fn test_writer_passthrough_without_redactor() {
        let sink = Captured::default();
        let make = RedactingMakeWriter::new(
            {
                let sink = sink.clone();
                move || sink.clone()
            },
            None,
        );

        make.make_writer().write_all(b"paz@mail.com").unwrap();

        assert_eq!(sink.0.lock().unwrap().as_slice(), b"paz@mail.com");
    }
}
