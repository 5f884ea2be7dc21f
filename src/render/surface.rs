use std::sync::Arc;

use crate::foundation::core::{Affine, BezPath, Canvas, Rect, Rgba8Premul};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::premultiply_rgba8_in_place;
use crate::render::frame::FrameRGBA;

/// Fixed-size raster target a video program draws on.
///
/// State set through [`Surface::set_transform`] survives [`Surface::transfer_frame`]; the pixels
/// do not.
pub trait Surface {
    /// Canvas size.
    fn canvas(&self) -> Canvas;
    /// Set the transform applied to subsequent drawing calls.
    fn set_transform(&mut self, transform: Affine);
    /// Fill an axis-aligned rectangle (in user space) with a solid color.
    fn fill_rect(&mut self, rect: Rect, color: Rgba8Premul);
    /// Fill a path with a solid color.
    fn fill_path(&mut self, path: &BezPath, color: Rgba8Premul);
    /// Draw a frame with its top-left corner at the user-space origin.
    fn draw_frame(&mut self, frame: &FrameRGBA, transform: Affine) -> ReelResult<()>;
    /// Discard everything drawn since the last transfer.
    fn clear(&mut self);
    /// Move the current pixels out as a frame and leave the surface cleared.
    fn transfer_frame(&mut self) -> ReelResult<FrameRGBA>;
}

/// Creates drawing surfaces inside the render unit.
pub trait SurfaceFactory: Send + Sync {
    /// Create a surface of the given size.
    fn create(&self, canvas: Canvas) -> ReelResult<Box<dyn Surface>>;
}

/// Factory for [`CpuSurface`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuSurfaceFactory;

impl SurfaceFactory for CpuSurfaceFactory {
    fn create(&self, canvas: Canvas) -> ReelResult<Box<dyn Surface>> {
        Ok(Box::new(CpuSurface::new(canvas)?))
    }
}

/// CPU raster surface powered by `vello_cpu`.
pub struct CpuSurface {
    width: u16,
    height: u16,
    transform: Affine,
    ctx: vello_cpu::RenderContext,
}

impl CpuSurface {
    /// Create a cleared surface. Both dimensions must fit in `u16`.
    pub fn new(canvas: Canvas) -> ReelResult<Self> {
        let width: u16 = canvas
            .width
            .try_into()
            .map_err(|_| ReelError::validation("surface width exceeds u16"))?;
        let height: u16 = canvas
            .height
            .try_into()
            .map_err(|_| ReelError::validation("surface height exceeds u16"))?;
        if width == 0 || height == 0 {
            return Err(ReelError::validation("surface width/height must be non-zero"));
        }
        Ok(Self {
            width,
            height,
            transform: Affine::IDENTITY,
            ctx: vello_cpu::RenderContext::new(width, height),
        })
    }

    fn apply_state(&mut self) {
        self.ctx
            .set_blend_mode(vello_cpu::peniko::BlendMode::default());
        self.ctx
            .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_transform(affine_to_cpu(self.transform));
    }
}

impl Surface for CpuSurface {
    fn canvas(&self) -> Canvas {
        Canvas {
            width: u32::from(self.width),
            height: u32::from(self.height),
        }
    }

    fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
        self.ctx.set_transform(affine_to_cpu(transform));
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba8Premul) {
        self.apply_state();
        self.ctx.set_paint(color_to_cpu(color));
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            rect.x0, rect.y0, rect.x1, rect.y1,
        ));
    }

    fn fill_path(&mut self, path: &BezPath, color: Rgba8Premul) {
        self.apply_state();
        self.ctx.set_paint(color_to_cpu(color));
        self.ctx.fill_path(&bezpath_to_cpu(path));
    }

    fn draw_frame(&mut self, frame: &FrameRGBA, transform: Affine) -> ReelResult<()> {
        let pixmap = if frame.premultiplied {
            pixmap_from_premul_bytes(&frame.data, frame.width, frame.height)?
        } else {
            let mut tmp = frame.data.clone();
            premultiply_rgba8_in_place(&mut tmp);
            pixmap_from_premul_bytes(&tmp, frame.width, frame.height)?
        };
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };

        self.apply_state();
        self.ctx
            .set_transform(affine_to_cpu(self.transform * transform));
        self.ctx.set_paint(paint);
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(frame.width),
            f64::from(frame.height),
        ));
        self.ctx.set_transform(affine_to_cpu(self.transform));
        Ok(())
    }

    fn clear(&mut self) {
        self.ctx.reset();
        self.apply_state();
    }

    fn transfer_frame(&mut self) -> ReelResult<FrameRGBA> {
        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut pixmap);
        self.clear();
        FrameRGBA::new(
            u32::from(self.width),
            u32::from(self.height),
            pixmap.data_as_u8_slice().to_vec(),
            true,
        )
    }
}

fn color_to_cpu(c: Rgba8Premul) -> vello_cpu::peniko::Color {
    if c.a == 0 {
        return vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 0);
    }
    let a = u32::from(c.a);
    let unpremul = |v: u8| ((u32::from(v) * 255 + a / 2) / a).min(255) as u8;
    vello_cpu::peniko::Color::from_rgba8(unpremul(c.r), unpremul(c.g), unpremul(c.b), c.a)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn pixmap_from_premul_bytes(bytes: &[u8], width: u32, height: u32) -> ReelResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| ReelError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ReelError::render("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(ReelError::render("pixmap byte len mismatch"));
    }
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
