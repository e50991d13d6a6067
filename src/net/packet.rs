// ─── Packet framing ───
// A complete packet is `length: varint | body`, where the length counts
// every byte after the length field. The builder accumulates body bytes
// and prepends the length on finish; the inbound side joins fragmented
// TCP reads until the promised byte count has arrived.

use crate::error::{CoreError, CoreResult};

use super::varint::{decode_varint, try_decode_varint, write_varint};

/// Accumulates a packet body; `finish` frames it with the outer length.
#[derive(Debug, Default)]
pub struct PacketBuilder {
    body: Vec<u8>,
}

impl PacketBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_byte(&mut self, byte: u8) -> &mut Self {
        self.body.push(byte);
        self
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.body.extend_from_slice(bytes);
        self
    }

    pub fn put_varint(&mut self, n: u32) -> &mut Self {
        write_varint(n, &mut self.body);
        self
    }

    pub fn put_u16(&mut self, n: u16) -> &mut Self {
        self.body.extend_from_slice(&n.to_be_bytes());
        self
    }

    /// Varint byte length followed by the UTF-8 bytes.
    pub fn put_string(&mut self, s: &str) -> &mut Self {
        write_varint(s.len() as u32, &mut self.body);
        self.body.extend_from_slice(s.as_bytes());
        self
    }

    pub fn finish(self) -> Vec<u8> {
        let mut framed = Vec::with_capacity(self.body.len() + 5);
        write_varint(self.body.len() as u32, &mut framed);
        framed.extend_from_slice(&self.body);
        framed
    }
}

/// An inbound packet assembled across one or more TCP reads.
///
/// The first chunk is expected to contain at least the outer length
/// varint; subsequent chunks are joined with [`append`](Self::append)
/// until [`is_complete`](Self::is_complete).
#[derive(Debug)]
pub struct InboundPacket {
    buf: Vec<u8>,
    /// Byte count promised by the outer length varint, once decodable.
    expected: Option<(usize, usize)>, // (body length, header length)
}

impl InboundPacket {
    pub fn new(first_chunk: &[u8]) -> CoreResult<Self> {
        let mut packet = Self {
            buf: Vec::with_capacity(first_chunk.len()),
            expected: None,
        };
        packet.append(first_chunk)?;
        Ok(packet)
    }

    pub fn append(&mut self, chunk: &[u8]) -> CoreResult<()> {
        self.buf.extend_from_slice(chunk);
        if self.expected.is_none() {
            if let Some((len, used)) = try_decode_varint(&self.buf)? {
                self.expected = Some((len as usize, used));
            }
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        match self.expected {
            Some((len, header)) => self.buf.len() >= header + len,
            None => false,
        }
    }

    /// Bytes still owed by the peer, when the length header has arrived.
    pub fn remaining(&self) -> Option<usize> {
        self.expected
            .map(|(len, header)| (header + len).saturating_sub(self.buf.len()))
    }

    /// Cursor over the packet body. Errors until the frame is complete.
    pub fn reader(&self) -> CoreResult<PacketReader<'_>> {
        let (len, header) = self
            .expected
            .ok_or_else(|| CoreError::Other("frame length not yet received".into()))?;
        if !self.is_complete() {
            return Err(CoreError::Other("frame incomplete".into()));
        }
        Ok(PacketReader {
            buf: &self.buf[header..header + len],
            pos: 0,
        })
    }
}

/// Sequential reader over a packet body.
#[derive(Debug)]
pub struct PacketReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn read_byte(&mut self) -> CoreResult<u8> {
        let byte = *self
            .buf
            .get(self.pos)
            .ok_or_else(|| CoreError::Other("packet underrun".into()))?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, n: usize) -> CoreResult<&'a [u8]> {
        let end = self.pos + n;
        if end > self.buf.len() {
            return Err(CoreError::Other("packet underrun".into()));
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn read_varint(&mut self) -> CoreResult<u32> {
        let (value, used) = decode_varint(&self.buf[self.pos..])?;
        self.pos += used;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> CoreResult<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Varint length followed by UTF-8-ish bytes. Invalid sequences are
    /// replaced rather than rejected; server MOTDs are not always clean.
    pub fn read_string(&mut self) -> CoreResult<String> {
        let len = self.read_varint()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}
