use std::io::Write;

use pvlive_client::GenerationSample;
use time::format_description::well_known::Rfc3339;

/// Write samples as `time,generation_mw` CSV; a missing reading is an empty cell.
pub fn write_samples<W: Write>(samples: &[GenerationSample], out: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["time", "generation_mw"])?;

    for sample in samples {
        let ts = sample
            .ts
            .format(&Rfc3339)
            .map_err(|e| csv::Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        let mw = sample.generation_mw.map(|v| v.to_string()).unwrap_or_default();
        wtr.write_record([ts, mw])?;
    }

    wtr.flush()?;
    Ok(())
}
