use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::{
    constants::{SAVE_HEADER_ID, SAVE_MAX_LEN, SAVE_VERSION},
    error::{Error, Result},
};

const TYPE_INT: u8 = 0;
const TYPE_FLOAT: u8 = 1;
const TYPE_DATA: u8 = 2;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    Data(Vec<u8>),
}

impl Value {
    fn tag(&self) -> u8 {
        match self {
            Value::Int(_) => TYPE_INT,
            Value::Float(_) => TYPE_FLOAT,
            Value::Data(_) => TYPE_DATA,
        }
    }

    fn bytes(&self) -> Vec<u8> {
        match self {
            Value::Int(v) => v.to_le_bytes().to_vec(),
            Value::Float(v) => v.to_le_bytes().to_vec(),
            Value::Data(data) => data.clone(),
        }
    }

    fn decode(tag: u8, data: &[u8]) -> Result<Self> {
        let word = || -> Result<[u8; 4]> {
            let mut bytes = [0; 4];
            if data.len() != 4 {
                return Err(Error::SaveInvalidDataLen(data.len()));
            }
            bytes.copy_from_slice(data);
            Ok(bytes)
        };
        match tag {
            TYPE_INT => Ok(Value::Int(i32::from_le_bytes(word()?))),
            TYPE_FLOAT => Ok(Value::Float(f32::from_le_bytes(word()?))),
            TYPE_DATA => Ok(Value::Data(data.to_vec())),
            _ => Err(Error::SaveInvalidType),
        }
    }
}

/// A small key/value store persisted as a flat list of tuples:
/// `[id len][id][type][data len][data]`. The first tuple is always the
/// version header.
///
/// The whole file is kept in memory; changes hit the disk on `flush`,
/// `close` or drop.
#[derive(Debug)]
pub struct Save {
    path: Option<PathBuf>,
    version: i32,
    entries: Vec<(String, Value)>,
    dirty: bool,
}

impl Save {
    /// Opens the save at `path`, creating it (with just the header) if it
    /// doesn't exist yet.
    pub fn bind<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Binding {} to a save file", path.display());

        let bytes = match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let mut save = Self {
            path: Some(path),
            version: SAVE_VERSION,
            entries: Vec::new(),
            dirty: false,
        };
        match bytes {
            Some(bytes) => save.parse(&bytes)?,
            None => {
                log::debug!("Creating a new save file");
                save.dirty = true;
                save.flush()?;
            }
        }
        log::debug!("Save file opened, version {:#x}", save.version);
        Ok(save)
    }

    fn parse(&mut self, bytes: &[u8]) -> Result<()> {
        let mut cursor = bytes;
        let mut header = true;
        while !cursor.is_empty() {
            let (id, value, rest) = read_tuple(cursor)?;
            cursor = rest;
            if header {
                match value {
                    Value::Int(version) if id == SAVE_HEADER_ID => {
                        if version != SAVE_VERSION {
                            return Err(Error::SaveInvalidVersion(version));
                        }
                        self.version = version;
                    }
                    _ => return Err(Error::SaveIdNotFound(SAVE_HEADER_ID.to_string())),
                }
                header = false;
            } else {
                self.put(id, value);
            }
        }
        if header {
            return Err(Error::FileEofReached);
        }
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.path.is_some()
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn write(&mut self, id: &str, value: Value) -> Result<()> {
        self.check_bound()?;
        check_id(id)?;
        if id == SAVE_HEADER_ID {
            return Err(Error::ArgumentsBad("the header id is reserved"));
        }
        if let Value::Data(data) = &value {
            if data.len() >= SAVE_MAX_LEN {
                return Err(Error::SaveInvalidDataLen(data.len()));
            }
        }
        self.put(id.to_string(), value);
        self.dirty = true;
        Ok(())
    }

    pub fn write_int(&mut self, id: &str, value: i32) -> Result<()> {
        self.write(id, Value::Int(value))
    }

    pub fn write_float(&mut self, id: &str, value: f32) -> Result<()> {
        self.write(id, Value::Float(value))
    }

    pub fn write_data(&mut self, id: &str, data: &[u8]) -> Result<()> {
        self.write(id, Value::Data(data.to_vec()))
    }

    pub fn read(&self, id: &str) -> Result<&Value> {
        self.check_bound()?;
        check_id(id)?;
        self.entries
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, value)| value)
            .ok_or_else(|| Error::SaveIdNotFound(id.to_string()))
    }

    pub fn read_int(&self, id: &str) -> Result<i32> {
        match self.read(id)? {
            Value::Int(v) => Ok(*v),
            _ => Err(Error::SaveInvalidType),
        }
    }

    pub fn read_float(&self, id: &str) -> Result<f32> {
        match self.read(id)? {
            Value::Float(v) => Ok(*v),
            _ => Err(Error::SaveInvalidType),
        }
    }

    pub fn read_data(&self, id: &str) -> Result<&[u8]> {
        match self.read(id)? {
            Value::Data(data) => Ok(data),
            _ => Err(Error::SaveInvalidType),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == id)
    }

    /// Drops every tuple but the header.
    pub fn erase(&mut self) -> Result<()> {
        self.check_bound()?;
        log::debug!("Erasing save file");
        self.entries.clear();
        self.dirty = true;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        let path = self.path.as_ref().ok_or(Error::SaveNotBound)?;
        if !self.dirty {
            return Ok(());
        }
        let mut out = Vec::new();
        write_tuple(&mut out, SAVE_HEADER_ID, &Value::Int(self.version));
        for (id, value) in &self.entries {
            write_tuple(&mut out, id, value);
        }
        fs::write(path, out)?;
        self.dirty = false;
        Ok(())
    }

    /// Flushes and unbinds. Further accesses fail with `SaveNotBound`.
    pub fn close(&mut self) -> Result<()> {
        self.flush()?;
        self.path = None;
        self.entries.clear();
        log::debug!("Save file closed");
        Ok(())
    }

    fn put(&mut self, id: String, value: Value) {
        match self.entries.iter_mut().find(|(key, _)| *key == id) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((id, value)),
        }
    }

    fn check_bound(&self) -> Result<()> {
        if self.path.is_none() {
            return Err(Error::SaveNotBound);
        }
        Ok(())
    }
}

impl Drop for Save {
    fn drop(&mut self) {
        if self.path.is_some() && self.dirty {
            if let Err(e) = self.flush() {
                log::warn!("Failed to flush save file: {}", e);
            }
        }
    }
}

fn check_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::ArgumentsBad("save id is empty"));
    }
    if id.len() >= SAVE_MAX_LEN {
        return Err(Error::SaveIdTooLong(id.len()));
    }
    Ok(())
}

fn write_tuple(out: &mut Vec<u8>, id: &str, value: &Value) {
    let data = value.bytes();
    out.push(id.len() as u8);
    out.extend_from_slice(id.as_bytes());
    out.push(value.tag());
    out.push(data.len() as u8);
    out.extend_from_slice(&data);
}

fn read_tuple(bytes: &[u8]) -> Result<(String, Value, &[u8])> {
    let (&id_len, rest) = bytes.split_first().ok_or(Error::FileEofReached)?;
    let (id, rest) = take(rest, id_len as usize)?;
    let id = String::from_utf8_lossy(id).into_owned();
    let (&tag, rest) = rest.split_first().ok_or(Error::FileEofReached)?;
    let (&data_len, rest) = rest.split_first().ok_or(Error::FileEofReached)?;
    let (data, rest) = take(rest, data_len as usize)?;
    Ok((id, Value::decode(tag, data)?, rest))
}

fn take(bytes: &[u8], len: usize) -> Result<(&[u8], &[u8])> {
    if bytes.len() < len {
        return Err(Error::FileEofReached);
    }
    Ok(bytes.split_at(len))
}
