// src/png.rs
//! Растровое превью карты для отладки
//!
//! Районы заливаются цветом своего типа, поверх рисуются кварталы, главное
//! здание, пригород, береговые линии, река, хребты и мосты. Координаты карты
//! умножаются на `scale`.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point as PixelPoint;

use crate::district::DistrictType;
use crate::geometry::{Point, Polygon};
use crate::map::Map;

const BACKGROUND: Rgba<u8> = Rgba([20, 20, 24, 255]);
const BLOCK: Rgba<u8> = Rgba([170, 150, 130, 255]);
const LANDMARK: Rgba<u8> = Rgba([200, 60, 50, 255]);
const SPRAWL: Rgba<u8> = Rgba([150, 120, 90, 255]);
const COAST: Rgba<u8> = Rgba([230, 220, 180, 255]);
const RIVER: Rgba<u8> = Rgba([60, 110, 200, 255]);
const RIDGE: Rgba<u8> = Rgba([90, 70, 50, 255]);
const BRIDGE: Rgba<u8> = Rgba([240, 240, 240, 255]);

/// Цвет заливки района
#[must_use]
pub fn district_color(district_type: DistrictType) -> Rgba<u8> {
    match district_type {
        DistrictType::Rural => Rgba([120, 160, 80, 255]),
        DistrictType::Urban => Rgba([110, 100, 95, 255]),
        DistrictType::Plaza => Rgba([200, 190, 160, 255]),
        DistrictType::Water => Rgba([40, 70, 130, 255]),
        DistrictType::Village => Rgba([150, 130, 90, 255]),
        DistrictType::Forest => Rgba([40, 100, 50, 255]),
    }
}

/// Рисует превью карты
#[must_use]
pub fn render_preview(map: &Map, scale: f64) -> RgbaImage {
    let width = ((map.width() * scale).ceil() as u32).max(1);
    let height = ((map.height() * scale).ceil() as u32).max(1);
    let mut img = RgbaImage::from_pixel(width, height, BACKGROUND);

    for district in map.districts() {
        let color = district_color(district.district_type);
        // вода рисуется исходной ячейкой, чтобы не оставалось щелей
        let outline = if district.is_water() {
            &district.original_polygon
        } else {
            &district.polygon
        };
        fill(&mut img, outline, scale, color);
        for block in &district.blocks {
            fill(&mut img, block, scale, BLOCK);
        }
        if let Some(landmark) = &district.landmark {
            fill(&mut img, landmark, scale, LANDMARK);
        }
    }
    for building in map.sprawl() {
        fill(&mut img, building, scale, SPRAWL);
    }

    for coast in map.coasts() {
        polyline(&mut img, coast, scale, COAST);
    }
    for ridge in map.ridges() {
        polyline(&mut img, ridge, scale, RIDGE);
    }
    polyline(&mut img, &map.river().path, scale, RIVER);
    for bridge in map.bridges() {
        polyline(&mut img, &[bridge.p1, bridge.p2], scale, BRIDGE);
    }
    img
}

fn fill(img: &mut RgbaImage, polygon: &Polygon, scale: f64, color: Rgba<u8>) {
    let mut pixels: Vec<PixelPoint<i32>> = Vec::with_capacity(polygon.len());
    for p in &polygon.points {
        let pixel = PixelPoint::new((p.x * scale).round() as i32, (p.y * scale).round() as i32);
        if pixels.last() != Some(&pixel) {
            pixels.push(pixel);
        }
    }
    // imageproc не принимает замкнутый контур
    while pixels.len() > 1 && pixels.first() == pixels.last() {
        pixels.pop();
    }
    if pixels.len() >= 3 {
        draw_polygon_mut(img, &pixels, color);
    }
}

fn polyline(img: &mut RgbaImage, points: &[Point], scale: f64, color: Rgba<u8>) {
    for pair in points.windows(2) {
        draw_line_segment_mut(
            img,
            ((pair[0].x * scale) as f32, (pair[0].y * scale) as f32),
            ((pair[1].x * scale) as f32, (pair[1].y * scale) as f32),
            color,
        );
    }
}

impl Map {
    /// Сохраняет растровое превью карты в PNG
    pub fn save_preview_png(&self, path: &str, scale: f64) -> Result<(), Box<dyn std::error::Error>> {
        render_preview(self, scale).save(path)?;
        Ok(())
    }
}
