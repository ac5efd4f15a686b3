// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Minimal little-endian codec for program arguments and account data.

use sha2::{Digest, Sha256};

use super::types::{LedgerError, Pubkey};

/// First eight bytes of `sha256("<namespace>:<name>")`.
pub fn discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Start instruction data for the named program method.
    pub fn instruction(name: &str) -> Self {
        let mut writer = Self::default();
        writer.buf.extend_from_slice(&discriminator("global", name));
        writer
    }

    pub fn u8(mut self, v: u8) -> Self {
        self.buf.push(v);
        self
    }

    pub fn u16(mut self, v: u16) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u32(mut self, v: u32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i32(mut self, v: i32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u64(mut self, v: u64) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn fixed(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn bytes(self, bytes: &[u8]) -> Self {
        self.u32(bytes.len() as u32).fixed(bytes)
    }

    pub fn string(self, s: &str) -> Self {
        self.bytes(s.as_bytes())
    }

    pub fn option<T>(self, value: Option<T>, write: impl FnOnce(Self, T) -> Self) -> Self {
        match value {
            Some(v) => write(self.u8(1), v),
            None => self.u8(0),
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

pub struct Reader<'a> {
    account: &'static str,
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Open account data, checking its `account:<name>` discriminator.
    pub fn account(account: &'static str, data: &'a [u8]) -> Result<Self, LedgerError> {
        let mut reader = Self {
            account,
            data,
            pos: 0,
        };
        let tag = reader.take(8)?;
        if tag != discriminator("account", account) {
            return Err(reader.error("discriminator mismatch"));
        }
        Ok(reader)
    }

    /// Open raw data with no discriminator.
    pub fn raw(account: &'static str, data: &'a [u8]) -> Self {
        Self {
            account,
            data,
            pos: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn error(&self, reason: impl Into<String>) -> LedgerError {
        LedgerError::AccountDecode {
            account: self.account,
            reason: reason.into(),
        }
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], LedgerError> {
        let slice = self
            .data
            .get(self.pos..self.pos + n)
            .ok_or_else(|| self.error(format!("truncated at byte {}", self.pos)))?;
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], LedgerError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, LedgerError> {
        Ok(self.take(1)?[0])
    }

    pub fn bool(&mut self) -> Result<bool, LedgerError> {
        Ok(self.u8()? != 0)
    }

    pub fn u16(&mut self) -> Result<u16, LedgerError> {
        self.array().map(u16::from_le_bytes)
    }

    pub fn u32(&mut self) -> Result<u32, LedgerError> {
        self.array().map(u32::from_le_bytes)
    }

    pub fn i32(&mut self) -> Result<i32, LedgerError> {
        self.array().map(i32::from_le_bytes)
    }

    pub fn u64(&mut self) -> Result<u64, LedgerError> {
        self.array().map(u64::from_le_bytes)
    }

    pub fn pubkey(&mut self) -> Result<Pubkey, LedgerError> {
        self.array().map(Pubkey::new)
    }

    pub fn bytes(&mut self) -> Result<Vec<u8>, LedgerError> {
        let len = self.u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    pub fn string(&mut self) -> Result<String, LedgerError> {
        let raw = self.bytes()?;
        String::from_utf8(raw).map_err(|_| self.error("string is not utf-8"))
    }

    pub fn option<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, LedgerError>,
    ) -> Result<Option<T>, LedgerError> {
        match self.u8()? {
            0 => Ok(None),
            1 => read(self).map(Some),
            other => Err(self.error(format!("invalid option tag {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_layout_is_little_endian() {
        let data = Writer::default()
            .u32(1)
            .option(Some(5u64), Writer::u64)
            .option(None::<i32>, Writer::i32)
            .string("ab")
            .finish();
        assert_eq!(
            data,
            vec![1, 0, 0, 0, 1, 5, 0, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, b'a', b'b']
        );
    }

    #[test]
    fn reader_checks_discriminator() {
        let mut data = discriminator("account", "Thing").to_vec();
        data.extend_from_slice(&7u16.to_le_bytes());
        let mut reader = Reader::account("Thing", &data).unwrap();
        assert_eq!(reader.u16().unwrap(), 7);

        assert!(Reader::account("Other", &data).is_err());
    }

    #[test]
    fn truncated_data_is_an_error() {
        let mut reader = Reader::raw("Thing", &[1, 2]);
        assert!(reader.u32().is_err());
    }

    #[test]
    fn instruction_data_starts_with_method_tag() {
        let data = Writer::instruction("issue_entity_v0").finish();
        assert_eq!(data, discriminator("global", "issue_entity_v0").to_vec());
    }
}
