use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Result;
use csv::Writer;
use image::RgbaImage;
use umbra_core::{Agent, OutputImage};

/// Snapshot writer for output images and agent data
pub struct SnapshotWriter {
    output_dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(output_dir: &Path) -> Result<Self> {
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Write the front image as `frame_NNNN.png`
    pub fn write_frame(&self, frame: u64, image: &OutputImage) -> Result<PathBuf> {
        let filepath = self.output_dir.join(format!("frame_{:04}.png", frame));
        save_output_png(image, &filepath)?;
        Ok(filepath)
    }

    /// Write agent positions and headings as `agents_NNNN.csv`
    pub fn write_agents(&self, frame: u64, agents: &[Agent]) -> Result<PathBuf> {
        let filepath = self.output_dir.join(format!("agents_{:04}.csv", frame));
        let file = File::create(&filepath)?;
        let mut csv_writer = Writer::from_writer(file);

        csv_writer.write_record(["id", "x", "y", "forward_x", "forward_y"])?;
        for (i, agent) in agents.iter().enumerate() {
            csv_writer.write_record(&[
                i.to_string(),
                agent.position[0].to_string(),
                agent.position[1].to_string(),
                agent.forward[0].to_string(),
                agent.forward[1].to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(filepath)
    }
}

/// Quantize an evaluator image and save it as PNG
pub fn save_output_png(image: &OutputImage, output_path: &Path) -> Result<()> {
    let [w, h] = image.size;
    let img = RgbaImage::from_raw(w, h, image.to_rgba8())
        .ok_or_else(|| anyhow::anyhow!("image buffer does not match {}x{}", w, h))?;
    img.save(output_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("umbra-headless-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn agents_csv_has_one_row_per_agent() {
        let dir = scratch_dir("agents");
        let writer = SnapshotWriter::new(&dir).unwrap();
        let agents = [Agent {
            forward: [1.0, 0.0],
            position: [0.25, 0.75],
        }; 3];

        let path = writer.write_agents(7, &agents).unwrap();
        assert!(path.ends_with("agents_0007.csv"));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "id,x,y,forward_x,forward_y");
        assert_eq!(lines[1], "0,0.25,0.75,1,0");
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn frames_are_saved_at_their_size() {
        let dir = scratch_dir("frames");
        let writer = SnapshotWriter::new(&dir).unwrap();
        let mut image = OutputImage::new([5, 3]);
        image.pixels[0] = [1.0, 0.5, 0.0, 1.0];

        let path = writer.write_frame(12, &image).unwrap();
        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (5, 3));
        assert_eq!(loaded.get_pixel(0, 0).0, [255, 128, 0, 255]);
        std::fs::remove_dir_all(dir).unwrap();
    }
}
