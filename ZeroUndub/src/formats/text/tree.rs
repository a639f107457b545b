//! Message tree discovery and serialization

use std::collections::BTreeSet;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use super::codec::Message;
use super::tables::CharacterTables;
use crate::error::{Error, Result};

/// Contents of a table node. A node never mixes sub-tables and messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableBody {
    Tables(Vec<MessageTable>),
    Messages(Vec<Message>),
}

/// One offset table of a message file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTable {
    /// Position within the parent table
    pub index: usize,
    /// Byte offset of the table inside the file
    pub offset: usize,
    /// Size of the offset list in bytes
    pub size: usize,
    pub body: TableBody,
}

impl MessageTable {
    /// Number of direct children
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.body {
            TableBody::Tables(tables) => tables.len(),
            TableBody::Messages(messages) => messages.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sub-tables, or an empty slice for a message table
    #[must_use]
    pub fn tables(&self) -> &[MessageTable] {
        match &self.body {
            TableBody::Tables(tables) => tables,
            TableBody::Messages(_) => &[],
        }
    }

    /// Messages, or an empty slice for a table of tables
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        match &self.body {
            TableBody::Messages(messages) => messages,
            TableBody::Tables(_) => &[],
        }
    }

    /// Serialize this table as if it started at `offset`.
    fn encode(&self, offset: usize, tables: &CharacterTables) -> Result<Vec<u8>> {
        let count = self.len();
        let mut header = Vec::with_capacity(count * 4);
        let mut body = Vec::new();
        let mut cursor = offset + count * 4;

        for child in 0..count {
            let bytes = match &self.body {
                TableBody::Tables(children) => children[child].encode(cursor, tables)?,
                TableBody::Messages(messages) => messages[child].encode(tables)?,
            };
            let pointer = u32::try_from(cursor).map_err(|_| Error::CorruptMessageTable {
                offset: self.offset,
                message: format!("child offset {cursor:#x} does not fit 32 bits"),
            })?;
            header.write_u32::<LittleEndian>(pointer)?;
            cursor += bytes.len();
            body.extend_from_slice(&bytes);
        }

        header.extend_from_slice(&body);
        Ok(header)
    }
}

/// A whole message file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTree {
    pub root: MessageTable,
}

/// Discovery result before message boundaries are known
enum Node {
    Table(DiscoveredTable),
    Message(usize),
}

struct DiscoveredTable {
    offset: usize,
    size: usize,
    children: Vec<Node>,
}

/// Read `offset` as an offset list.
///
/// Returns the child offsets and the list size, or `None` when the words
/// at `offset` cannot be a table.
fn probe_table(data: &[u8], offset: usize) -> Option<(Vec<usize>, usize)> {
    let file_size = data.len();
    let mut limit = file_size;
    let mut pos = offset;
    let mut children = Vec::new();

    loop {
        if pos + 4 >= file_size {
            return None;
        }
        let address = LittleEndian::read_u32(&data[pos..pos + 4]) as usize;
        pos += 4;
        limit = limit.min(address);

        if address > file_size || limit < offset {
            return None;
        }
        children.push(address);

        if limit <= pos {
            break;
        }
    }

    Some((children, limit - offset))
}

fn discover(
    data: &[u8],
    offset: usize,
    children: Vec<usize>,
    size: usize,
    ancestors: &mut Vec<usize>,
    boundaries: &mut BTreeSet<usize>,
) -> Result<DiscoveredTable> {
    ancestors.push(offset);
    boundaries.insert(offset);

    let mut nodes = Vec::with_capacity(children.len());
    for child in children {
        let probed = if ancestors.contains(&child) {
            None
        } else {
            probe_table(data, child)
        };

        let node = match probed {
            Some((grandchildren, child_size)) => Node::Table(discover(
                data,
                child,
                grandchildren,
                child_size,
                ancestors,
                boundaries,
            )?),
            None => {
                boundaries.insert(child);
                Node::Message(child)
            }
        };
        nodes.push(node);
    }
    ancestors.pop();

    let tables = nodes
        .iter()
        .filter(|node| matches!(node, Node::Table(_)))
        .count();
    if tables != 0 && tables != nodes.len() {
        return Err(Error::CorruptMessageTable {
            offset,
            message: format!(
                "{tables} sub-tables mixed with {} messages",
                nodes.len() - tables
            ),
        });
    }

    Ok(DiscoveredTable {
        offset,
        size,
        children: nodes,
    })
}

fn build_table(
    table: DiscoveredTable,
    index: usize,
    data: &[u8],
    boundaries: &BTreeSet<usize>,
    tables: &CharacterTables,
) -> MessageTable {
    let DiscoveredTable {
        offset,
        size,
        children,
    } = table;

    let body = if matches!(children.first(), Some(Node::Table(_))) {
        TableBody::Tables(
            children
                .into_iter()
                .enumerate()
                .filter_map(|(i, child)| match child {
                    Node::Table(table) => Some(build_table(table, i, data, boundaries, tables)),
                    Node::Message(_) => None,
                })
                .collect(),
        )
    } else {
        TableBody::Messages(
            children
                .into_iter()
                .enumerate()
                .filter_map(|(i, child)| match child {
                    Node::Message(offset) => {
                        let end = boundaries
                            .range(offset + 1..)
                            .next()
                            .copied()
                            .unwrap_or(data.len());
                        Some(Message::decode(i, offset, &data[offset..end], tables))
                    }
                    Node::Table(_) => None,
                })
                .collect(),
        )
    };

    MessageTable {
        index,
        offset,
        size,
        body,
    }
}

impl MessageTree {
    /// Discover and decode the tree of a message file.
    ///
    /// # Errors
    /// Returns [`Error::CorruptMessageTable`] when the file does not start
    /// with an offset table or a table mixes sub-tables and messages.
    pub fn parse(data: &[u8], tables: &CharacterTables) -> Result<Self> {
        let (children, size) =
            probe_table(data, 0).ok_or_else(|| Error::CorruptMessageTable {
                offset: 0,
                message: "file does not start with an offset table".to_string(),
            })?;

        let mut boundaries = BTreeSet::new();
        let root = discover(data, 0, children, size, &mut Vec::new(), &mut boundaries)?;
        boundaries.insert(data.len());

        tracing::debug!(
            "Discovered message tree with {} nodes in {} bytes",
            boundaries.len() - 1,
            data.len()
        );

        Ok(Self {
            root: build_table(root, 0, data, &boundaries, tables),
        })
    }

    /// Serialize the tree, laying children out depth first after their
    /// table.
    pub fn encode(&self, tables: &CharacterTables) -> Result<Vec<u8>> {
        self.root.encode(0, tables)
    }

    /// Every message in file order
    #[must_use]
    pub fn messages(&self) -> Vec<&Message> {
        fn collect<'a>(table: &'a MessageTable, out: &mut Vec<&'a Message>) {
            match &table.body {
                TableBody::Tables(children) => {
                    children.iter().for_each(|child| collect(child, out));
                }
                TableBody::Messages(messages) => out.extend(messages),
            }
        }

        let mut out = Vec::new();
        collect(&self.root, &mut out);
        out
    }
}
