use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::core::config::SpeciesSettings;
use crate::swarm::pheromone::TrailField;
use crate::swarm::pool::AgentPool;

#[inline]
fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Color every pixel by the species colors weighted by their trail channels.
///
/// `image` must match the field dimensions. Rows are filled in parallel.
pub fn composite_trails(field: &TrailField, species: &[SpeciesSettings], image: &mut RgbaImage) {
    assert_eq!(
        (image.width() as usize, image.height() as usize),
        (field.width, field.height),
        "display image must match the trail field"
    );
    let w = field.width;
    let plane = field.plane_len();
    let data = field.current();
    let channels = field.channels.min(species.len());

    let pixels: &mut [u8] = image;
    pixels.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let cell = y * w + x;
            let mut rgb = [0.0f32; 3];
            for (ch, settings) in species.iter().enumerate().take(channels) {
                let v = data[ch * plane + cell];
                for (c, out) in rgb.iter_mut().enumerate() {
                    *out += settings.color[c] * v;
                }
            }
            px[0] = quantize(rgb[0]);
            px[1] = quantize(rgb[1]);
            px[2] = quantize(rgb[2]);
            px[3] = 255;
        }
    });
}

/// Clear to opaque black and plot every agent in its species color.
/// The trail field is not consulted.
pub fn composite_agents(pool: &AgentPool, species: &[SpeciesSettings], image: &mut RgbaImage) {
    let pixels: &mut [u8] = image;
    pixels.par_chunks_mut(4).for_each(|px| px.copy_from_slice(&[0, 0, 0, 255]));

    let (w, h) = image.dimensions();
    for agent in pool.iter() {
        let (x, y) = agent.cell();
        if x as u32 >= w || y as u32 >= h {
            continue;
        }
        let c = species[agent.species_index as usize].color;
        image.put_pixel(x as u32, y as u32, Rgba([quantize(c[0]), quantize(c[1]), quantize(c[2]), 255]));
    }
}
