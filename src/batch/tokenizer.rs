/*!
 * Tokenizer
 * Splits a byte stream into NUL-delimited tokens across read boundaries
 */

use super::config::OversizedPolicy;
use crate::core::errors::{LaunchError, LaunchResult};
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use tracing::warn;

/// Lending reader: each token borrows the reader until the next call
pub struct TokenReader<R> {
    reader: R,
    path: PathBuf,
    buf: Vec<u8>,
    start: usize,
    end: usize,
    token: Vec<u8>,
    limit: usize,
    policy: OversizedPolicy,
    partial: bool,
    truncated: bool,
    emitted: bool,
    eof: bool,
    tokens: usize,
}

impl<R: Read> TokenReader<R> {
    /// `buffer_size` bytes are read at a time; tokens longer than `limit`
    /// bytes are handled by `policy`
    pub fn new(
        reader: R,
        path: PathBuf,
        buffer_size: usize,
        limit: usize,
        policy: OversizedPolicy,
    ) -> Self {
        Self {
            reader,
            path,
            buf: vec![0; buffer_size.max(1)],
            start: 0,
            end: 0,
            token: Vec::new(),
            limit,
            policy,
            partial: false,
            truncated: false,
            emitted: false,
            eof: false,
            tokens: 0,
        }
    }

    /// Tokens returned so far
    pub fn tokens(&self) -> usize {
        self.tokens
    }

    /// The token returned by the last `next_token` call
    pub fn current(&self) -> Option<&[u8]> {
        self.emitted.then_some(self.token.as_slice())
    }

    /// Next token, `None` at end of input
    ///
    /// Adjacent NULs produce empty tokens; a trailing NUL does not. End of
    /// input terminates a final unterminated token.
    pub fn next_token(&mut self) -> LaunchResult<Option<&[u8]>> {
        if self.emitted {
            self.token.clear();
            self.emitted = false;
            self.truncated = false;
        }

        loop {
            if self.start < self.end {
                let chunk = &self.buf[self.start..self.end];
                let nul = chunk.iter().position(|&b| b == 0);
                let piece = &chunk[..nul.unwrap_or(chunk.len())];

                absorb(
                    &mut self.token,
                    piece,
                    self.limit,
                    self.policy,
                    &mut self.truncated,
                )?;

                match nul {
                    Some(pos) => {
                        self.start += pos + 1;
                        return Ok(Some(self.emit()));
                    }
                    None => {
                        self.partial = true;
                        self.start = self.end;
                    }
                }
            }

            if self.eof {
                if self.partial {
                    return Ok(Some(self.emit()));
                }
                return Ok(None);
            }

            self.fill()?;
        }
    }

    fn emit(&mut self) -> &[u8] {
        if self.truncated {
            warn!(
                path = %self.path.display(),
                limit = self.limit,
                index = self.tokens,
                "token truncated to the single argument limit"
            );
        }
        self.partial = false;
        self.emitted = true;
        self.tokens += 1;
        &self.token
    }

    fn fill(&mut self) -> LaunchResult<()> {
        loop {
            match self.reader.read(&mut self.buf) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.start = 0;
                    self.end = n;
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(LaunchError::SourceRead {
                        path: self.path.clone(),
                        source,
                    })
                }
            }
        }
    }
}

/// Append `piece` to `token`, enforcing `limit`
fn absorb(
    token: &mut Vec<u8>,
    piece: &[u8],
    limit: usize,
    policy: OversizedPolicy,
    truncated: &mut bool,
) -> LaunchResult<()> {
    let room = limit.saturating_sub(token.len());
    if piece.len() <= room {
        token.extend_from_slice(piece);
        return Ok(());
    }

    match policy {
        OversizedPolicy::Reject => Err(LaunchError::OversizedToken {
            length: token.len() + piece.len(),
            limit,
        }),
        OversizedPolicy::Truncate => {
            token.extend_from_slice(&piece[..room]);
            *truncated = true;
            Ok(())
        }
    }
}
