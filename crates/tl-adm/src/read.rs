//! Binary ADM decoding.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use tl_tree::{NodeId, StrId, Tree, Value};
use tl_utils::unicode::{decode_utf16, Endian};

use crate::error::{AdmError, AdmWarning};
use crate::VERSION;

/// A successfully decoded tree plus anything worth telling the operator.
#[derive(Debug)]
pub struct Loaded {
    pub tree: Tree,
    pub warnings: Vec<AdmWarning>,
}

/// Bounds-checked little-endian cursor over the input.
struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], AdmError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(AdmError::UnexpectedEof { offset: self.pos })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, AdmError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, AdmError> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }
}

/// Decode a binary ADM buffer into a fresh tree.
pub fn read(input: &[u8]) -> Result<Loaded, AdmError> {
    let mut reader = ByteReader::new(input);
    let mut tree = Tree::unnamed();
    let mut warnings = Vec::new();

    let version = reader.u32()?;
    if version != VERSION {
        warnings.push(AdmWarning::VersionMismatch { found: version });
    }

    let mut ids = IdMap::load(&mut reader, &mut tree)?;

    // Root node, then its descendants with an explicit stack.
    struct Frame {
        node: NodeId,
        remaining: u32,
    }

    let root = tree.root();
    let name = ids.translate(reader.u32()?, &mut tree);
    tree.set_name(root, name);
    let attr_count = reader.u32()?;
    read_attrs(&mut reader, &mut tree, &mut ids, root, attr_count)?;
    let mut stack = vec![Frame {
        node: root,
        remaining: reader.u32()?,
    }];

    while let Some(frame) = stack.last_mut() {
        if frame.remaining == 0 {
            stack.pop();
            continue;
        }
        frame.remaining -= 1;
        let parent = frame.node;

        let name = ids.translate(reader.u32()?, &mut tree);
        let node = tree.add_child(parent, name);

        let attr_count = reader.u32()?;
        read_attrs(&mut reader, &mut tree, &mut ids, node, attr_count)?;

        let child_count = reader.u32()?;
        stack.push(Frame {
            node,
            remaining: child_count,
        });
    }

    Ok(Loaded { tree, warnings })
}

/// Memory-map `path` and decode it. The file handle is dropped as soon as
/// the mapping exists; zero-length files skip the mapping entirely.
pub fn read_file(path: impl AsRef<Path>) -> Result<Loaded, AdmError> {
    let file = File::open(path.as_ref())?;
    let map = if file.metadata()?.len() == 0 {
        None
    } else {
        Some(unsafe { Mmap::map(&file)? })
    };
    drop(file);

    read(map.as_ref().map_or(&[][..], |m| &m[..]))
}

/// Stream-id → interned-id translation.
///
/// Every id in the stream is remapped into the destination tree's own
/// interner. A reference to an id the string table never declared maps to a
/// freshly interned empty string, so the tree stays well-formed.
struct IdMap {
    map: HashMap<u32, StrId>,
}

impl IdMap {
    fn load(reader: &mut ByteReader<'_>, tree: &mut Tree) -> Result<IdMap, AdmError> {
        let count = reader.u32()?;
        let mut map = HashMap::with_capacity(count as usize);

        for _ in 0..count {
            let id = reader.u32()?;
            let units = reader.u32()? as usize;
            let byte_len = units
                .checked_mul(2)
                .ok_or(AdmError::UnexpectedEof { offset: reader.pos })?;
            let bytes = reader.take(byte_len)?;
            let s: String = decode_utf16(bytes, Endian::Little).collect();
            map.insert(id, tree.intern(&s));
        }

        Ok(IdMap { map })
    }

    fn translate(&mut self, raw: u32, tree: &mut Tree) -> StrId {
        *self.map.entry(raw).or_insert_with(|| tree.intern(""))
    }
}

fn read_attrs(
    reader: &mut ByteReader<'_>,
    tree: &mut Tree,
    ids: &mut IdMap,
    node: NodeId,
    count: u32,
) -> Result<(), AdmError> {
    for _ in 0..count {
        let name = ids.translate(reader.u32()?, tree);
        let tag_offset = reader.pos;
        let tag = reader.u32()?;

        let value = match tag {
            1 => Value::Int(reader.u32()? as i32),
            2 => Value::Float(f32::from_bits(reader.u32()?)),
            3 => Value::Double(f64::from_bits(reader.u64()?)),
            4 => Value::UInt(reader.u32()?),
            5 => Value::Str(ids.translate(reader.u32()?, tree)),
            6 => Value::Bool(reader.u32()? != 0),
            7 => Value::Int64(reader.u64()? as i64),
            8 => Value::Translate(ids.translate(reader.u32()?, tree)),
            tag => {
                return Err(AdmError::UnknownAttributeType {
                    tag,
                    offset: tag_offset,
                })
            }
        };

        tree.insert_attr(node, name, value);
    }

    Ok(())
}
