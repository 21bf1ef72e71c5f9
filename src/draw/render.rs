//! Cairo painting of a [`Scene`].

use std::f64::consts::PI;

use super::color::{self, Color};
use super::scene::{MenuScene, Scene};
use crate::input::menu::CORNER_RADIUS;
use crate::util::Rect;

const FONT: &str = "Sans 9";
const HANDLE_DRAW_RADIUS: f64 = 4.0;
const BUTTON_RADIUS: f64 = 5.0;
const RESULT_AREA_RADIUS: f64 = 8.0;
const SHADOW_OFFSET: f64 = 3.0;
/// Result text inset from the left edge of the result area.
const TEXT_INSET_X: f64 = 10.0;
const TEXT_INSET_Y: f64 = 10.0;

/// Paints `scene` into `ctx`, whose target is `buffer_size` pixels covering a
/// `logical_size` overlay.
pub fn render_scene(
    ctx: &cairo::Context,
    scene: &Scene,
    frozen: Option<&cairo::ImageSurface>,
    logical_size: (u32, u32),
    buffer_size: (u32, u32),
) -> Result<(), cairo::Error> {
    ctx.save()?;
    ctx.set_operator(cairo::Operator::Clear);
    ctx.paint()?;
    ctx.restore()?;

    if logical_size.0 == 0 || logical_size.1 == 0 {
        return Ok(());
    }
    // Everything below is drawn in logical units.
    ctx.scale(
        buffer_size.0 as f64 / logical_size.0 as f64,
        buffer_size.1 as f64 / logical_size.1 as f64,
    );

    if let (true, Some(frozen)) = (scene.show_frozen, frozen) {
        paint_frozen(ctx, frozen, logical_size)?;
    }
    if let Some(selection) = scene.selection {
        render_selection(ctx, selection, logical_size)?;
    }
    for highlight in &scene.highlights {
        render_highlight(ctx, *highlight)?;
    }
    if let Some(menu) = &scene.menu {
        render_menu(ctx, menu)?;
    }
    Ok(())
}

fn paint_frozen(
    ctx: &cairo::Context,
    frozen: &cairo::ImageSurface,
    logical_size: (u32, u32),
) -> Result<(), cairo::Error> {
    if frozen.width() <= 0 || frozen.height() <= 0 {
        return Ok(());
    }
    ctx.save()?;
    ctx.scale(
        logical_size.0 as f64 / frozen.width() as f64,
        logical_size.1 as f64 / frozen.height() as f64,
    );
    ctx.set_source_surface(frozen, 0.0, 0.0)?;
    ctx.source().set_filter(cairo::Filter::Bilinear);
    ctx.paint()?;
    ctx.restore()
}

/// Dims everything outside `rect`, then draws its border and corner handles.
fn render_selection(
    ctx: &cairo::Context,
    rect: Rect,
    logical_size: (u32, u32),
) -> Result<(), cairo::Error> {
    ctx.save()?;
    ctx.set_fill_rule(cairo::FillRule::EvenOdd);
    ctx.rectangle(0.0, 0.0, logical_size.0 as f64, logical_size.1 as f64);
    ctx.rectangle(rect.x, rect.y, rect.width, rect.height);
    color::DIM.apply(ctx);
    ctx.fill()?;
    ctx.restore()?;

    color::SELECTION_BORDER.apply(ctx);
    ctx.set_line_width(1.0);
    ctx.rectangle(rect.x, rect.y, rect.width, rect.height);
    ctx.stroke()?;

    color::HANDLE.apply(ctx);
    let (min, max) = (rect.min(), rect.max());
    for (x, y) in [(min.x, min.y), (max.x, min.y), (min.x, max.y), (max.x, max.y)] {
        ctx.new_sub_path();
        ctx.arc(x, y, HANDLE_DRAW_RADIUS, 0.0, 2.0 * PI);
    }
    ctx.fill()
}

fn render_highlight(ctx: &cairo::Context, rect: Rect) -> Result<(), cairo::Error> {
    ctx.rectangle(rect.x, rect.y, rect.width, rect.height);
    color::HIGHLIGHT_FILL.apply(ctx);
    ctx.fill_preserve()?;
    color::HIGHLIGHT_STROKE.apply(ctx);
    ctx.set_line_width(1.0);
    ctx.stroke()
}

fn rounded_rect(ctx: &cairo::Context, rect: Rect, radius: f64) {
    let r = radius.min(rect.width / 2.0).min(rect.height / 2.0);
    let (x, y, w, h) = (rect.x, rect.y, rect.width, rect.height);
    ctx.new_sub_path();
    ctx.arc(x + w - r, y + r, r, -PI / 2.0, 0.0);
    ctx.arc(x + w - r, y + h - r, r, 0.0, PI / 2.0);
    ctx.arc(x + r, y + h - r, r, PI / 2.0, PI);
    ctx.arc(x + r, y + r, r, PI, 3.0 * PI / 2.0);
    ctx.close_path();
}

fn fill_rounded(
    ctx: &cairo::Context,
    rect: Rect,
    radius: f64,
    fill: Color,
    border: Option<(Color, f64)>,
) -> Result<(), cairo::Error> {
    rounded_rect(ctx, rect, radius);
    fill.apply(ctx);
    ctx.fill()?;
    if let Some((stroke, width)) = border {
        rounded_rect(ctx, rect, radius);
        stroke.apply(ctx);
        ctx.set_line_width(width);
        ctx.stroke()?;
    }
    Ok(())
}

fn render_menu(ctx: &cairo::Context, menu: &MenuScene) -> Result<(), cairo::Error> {
    let shadow = Rect::new(
        menu.bounds.x + SHADOW_OFFSET,
        menu.bounds.y + SHADOW_OFFSET,
        menu.bounds.width,
        menu.bounds.height,
    );
    fill_rounded(ctx, shadow, CORNER_RADIUS, color::MENU_SHADOW, None)?;
    fill_rounded(
        ctx,
        menu.bounds,
        CORNER_RADIUS,
        color::MENU_PANEL,
        Some((color::MENU_BORDER, 1.2)),
    )?;

    let layout = pangocairo::functions::create_layout(ctx);
    layout.set_font_description(Some(&pango::FontDescription::from_string(FONT)));

    for button in &menu.buttons {
        let (fill, border) = if button.pressed {
            (color::BUTTON_PRESSED, color::BUTTON_BORDER_PRESSED)
        } else {
            (color::BUTTON, color::BUTTON_BORDER)
        };
        fill_rounded(ctx, button.bounds, BUTTON_RADIUS, fill, Some((border, 0.8)))?;

        layout.set_text(button.action.label());
        let (text_w, text_h) = layout.pixel_size();
        color::BUTTON_TEXT.apply(ctx);
        ctx.move_to(
            button.bounds.x + (button.bounds.width - text_w as f64) / 2.0,
            button.bounds.y + (button.bounds.height - text_h as f64) / 2.0,
        );
        pangocairo::functions::show_layout(ctx, &layout);
    }

    let area = menu.result_area;
    fill_rounded(
        ctx,
        area,
        RESULT_AREA_RADIUS,
        color::RESULT_AREA,
        Some((color::RESULT_AREA_BORDER, 1.0)),
    )?;

    ctx.save()?;
    rounded_rect(ctx, area, RESULT_AREA_RADIUS);
    ctx.clip();
    layout.set_width(((area.width - TEXT_INSET_X * 3.0) * pango::SCALE as f64) as i32);
    layout.set_wrap(pango::WrapMode::WordChar);
    layout.set_text(&menu.text);
    color::RESULT_TEXT.apply(ctx);
    ctx.move_to(area.x + TEXT_INSET_X, area.y + TEXT_INSET_Y);
    pangocairo::functions::show_layout(ctx, &layout);
    ctx.restore()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(surface: &mut cairo::ImageSurface, x: usize, y: usize) -> [u8; 4] {
        let stride = surface.stride() as usize;
        let data = surface.data().unwrap();
        let i = y * stride + x * 4;
        [data[i], data[i + 1], data[i + 2], data[i + 3]]
    }

    fn solid(width: i32, height: i32, bgra: [u8; 4]) -> cairo::ImageSurface {
        let data: Vec<u8> = bgra.iter().copied().cycle().take((width * height * 4) as usize).collect();
        cairo::ImageSurface::create_for_data(data, cairo::Format::ARgb32, width, height, width * 4)
            .unwrap()
    }

    #[test]
    fn empty_scene_clears_to_transparent() {
        let mut target = solid(20, 20, [9, 9, 9, 255]);
        {
            let ctx = cairo::Context::new(&target).unwrap();
            render_scene(&ctx, &Scene::default(), None, (20, 20), (20, 20)).unwrap();
        }
        assert_eq!(pixel(&mut target, 5, 5), [0, 0, 0, 0]);
    }

    #[test]
    fn frozen_image_is_scaled_and_outside_is_dimmed() {
        let frozen = solid(10, 10, [0, 0, 255, 255]);
        let mut target = cairo::ImageSurface::create(cairo::Format::ARgb32, 40, 40).unwrap();
        let scene = Scene {
            show_frozen: true,
            selection: Some(Rect::new(5.0, 5.0, 10.0, 10.0)),
            ..Scene::default()
        };
        {
            let ctx = cairo::Context::new(&target).unwrap();
            // 20x20 logical overlay on a 40x40 buffer
            render_scene(&ctx, &scene, Some(&frozen), (20, 20), (40, 40)).unwrap();
        }
        // Inside the selection the frozen red is untouched.
        assert_eq!(pixel(&mut target, 20, 20), [0, 0, 255, 255]);
        // Outside it is darkened by the dim layer.
        let outside = pixel(&mut target, 36, 36);
        assert!(outside[2] < 200 && outside[2] > 150, "{:?}", outside);
    }
}
