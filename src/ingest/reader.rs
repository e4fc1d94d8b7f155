/// Line-delimited JSON reading source
///
/// Each non-empty line is one already-decoded reading, e.g.
/// `{"mac":"A4:C1:38:11:22:33","temp_cc":2134,"humi_cpct":4512,"cnt":17,"rssi":-71}`.
/// Lines starting with `#` are ignored.
use log::{debug, error, info};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use crate::error::IngestError;
use crate::models::RawReading;

pub fn parse_reading(line: &str) -> Result<RawReading, serde_json::Error> {
    serde_json::from_str(line)
}

/// Forward readings from `input` until end of input or until the receiver goes away
///
/// Lines that are not UTF-8 or not a valid reading are logged and skipped.
/// Returns the number of readings forwarded.
pub async fn read_readings<R>(
    mut input: R,
    tx: mpsc::Sender<RawReading>,
) -> Result<usize, IngestError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut forwarded = 0;
    let mut line_no = 0usize;

    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        line_no += 1;

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                error!("Skipping line {}: {}", line_no, e);
                continue;
            }
        };
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let reading = match parse_reading(line) {
            Ok(reading) => reading,
            Err(e) => {
                error!("Skipping line {}: {}", line_no, e);
                continue;
            }
        };
        debug!("Reading from {} cnt={}", reading.mac, reading.cnt);

        if tx.send(reading).await.is_err() {
            info!("Reading receiver closed, stopping input");
            break;
        }
        forwarded += 1;
    }

    Ok(forwarded)
}
