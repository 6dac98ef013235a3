//! Bulk transfer reassembly
//!
//! Large responses (user tables, attendance logs) announce a total byte
//! length up front and stream across multiple packets. The reassembler
//! issues continuation requests until the accumulated byte count equals
//! the announced total. It never returns a truncated buffer as if it
//! were complete: an aborted transfer is a `PartialData` error.

use byteorder::{ByteOrder, LittleEndian};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use punchcard_core::{
    constants::{MAX_CHUNK_TCP, MAX_CHUNK_UDP},
    Command, TransportKind,
};

use crate::device::Device;
use crate::error::{Error, Result};

impl Device {
    /// Read one bulk table from the device
    ///
    /// Sends CMD_PREPARE_BUFFER for `table`. A small response comes back
    /// in a single data packet; a large one announces its total size and
    /// is pulled down chunk by chunk.
    pub(crate) async fn read_bulk(&mut self, table: Command, fct: i32) -> Result<Bytes> {
        let mut payload = BytesMut::with_capacity(11);
        payload.put_u8(1);
        payload.put_u16_le(table.into());
        payload.put_i32_le(fct);
        payload.put_i32_le(0); // ext

        let reply = self
            .send_command(Command::PrepareBuffer, payload.freeze())
            .await?;

        match reply.command {
            Command::Data => {
                debug!(bytes = reply.payload.len(), table = %table, "Bulk response fit one packet");
                Ok(reply.payload)
            }
            Command::PrepareData => {
                if reply.payload.len() < 5 {
                    return Err(Error::InvalidResponse(format!(
                        "prepare-data announcement too short: {} bytes",
                        reply.payload.len()
                    )));
                }

                let total = LittleEndian::read_u32(&reply.payload[1..5]) as usize;
                self.read_announced(total).await
            }
            // An empty table acks without data
            Command::AckOk => Ok(Bytes::new()),
            other => Err(Error::UnexpectedReply {
                sent: Command::PrepareBuffer,
                got: other,
            }),
        }
    }

    /// Pull down an announced transfer in chunks
    async fn read_announced(&mut self, total: usize) -> Result<Bytes> {
        debug!(total, "Bulk transfer announced");

        if total == 0 {
            return Ok(Bytes::new());
        }

        let limit = match self.transport_kind() {
            TransportKind::Tcp => MAX_CHUNK_TCP,
            TransportKind::Udp => MAX_CHUNK_UDP,
        };

        let mut data = BytesMut::with_capacity(total);

        while data.len() < total {
            let want = limit.min(total - data.len());

            let chunk = match self.read_chunk(data.len() as u32, want as u32).await {
                Ok(chunk) => chunk,
                Err(e @ (Error::Timeout { .. } | Error::Connection(_) | Error::NotConnected)) => {
                    warn!(
                        error = %e,
                        received = data.len(),
                        expected = total,
                        "Bulk transfer aborted mid-stream"
                    );
                    return Err(Error::PartialData {
                        expected: total,
                        received: data.len(),
                    });
                }
                Err(e) => return Err(e),
            };

            if chunk.is_empty() {
                return Err(Error::PartialData {
                    expected: total,
                    received: data.len(),
                });
            }

            data.extend_from_slice(&chunk);
        }

        // Release the device-side buffer; a failure here does not
        // invalidate data we already hold
        if let Err(e) = self.send_command(Command::FreeData, Bytes::new()).await {
            debug!(error = %e, "Free-data command failed");
        }

        if data.len() != total {
            return Err(Error::PartialData {
                expected: total,
                received: data.len(),
            });
        }

        debug!(bytes = data.len(), "Bulk transfer complete");
        Ok(data.freeze())
    }

    /// Request one chunk of the device buffer at `start`
    async fn read_chunk(&mut self, start: u32, size: u32) -> Result<Bytes> {
        trace!(start, size, "Requesting chunk");

        let mut payload = BytesMut::with_capacity(8);
        payload.put_i32_le(start as i32);
        payload.put_i32_le(size as i32);

        let reply = self
            .send_command(Command::ReadBuffer, payload.freeze())
            .await?;
        let reply_id = reply.reply_id;

        match reply.command {
            // Chunk streams as data packets, the first already in hand
            Command::Data => {
                let mut chunk = BytesMut::from(&reply.payload[..]);

                while chunk.len() < size as usize {
                    let next = self.receive_reply(reply_id).await?;
                    if next.command != Command::Data {
                        return Err(Error::UnexpectedReply {
                            sent: Command::ReadBuffer,
                            got: next.command,
                        });
                    }
                    chunk.extend_from_slice(&next.payload);
                }

                Ok(chunk.freeze())
            }
            // Chunk size re-announced, data packets follow, ack trails
            Command::PrepareData => {
                if reply.payload.len() < 4 {
                    return Err(Error::InvalidResponse(
                        "chunk announcement too short".into(),
                    ));
                }

                let announced = LittleEndian::read_u32(&reply.payload[0..4]) as usize;
                let mut chunk = BytesMut::with_capacity(announced);

                while chunk.len() < announced {
                    let next = self.receive_reply(reply_id).await?;
                    match next.command {
                        Command::Data => chunk.extend_from_slice(&next.payload),
                        other => {
                            return Err(Error::UnexpectedReply {
                                sent: Command::ReadBuffer,
                                got: other,
                            })
                        }
                    }
                }

                let ack = self.receive_reply(reply_id).await?;
                if ack.command != Command::AckOk {
                    debug!(got = %ack.command, "Expected ack after chunk data");
                }

                Ok(chunk.freeze())
            }
            other => Err(Error::UnexpectedReply {
                sent: Command::ReadBuffer,
                got: other,
            }),
        }
    }
}
