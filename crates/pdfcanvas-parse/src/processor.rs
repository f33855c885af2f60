//! Content-stream processor.
//!
//! [`CanvasProcessor`] walks a decoded content stream, keeps the graphics
//! state stack, text object state, current path and marked-content stack,
//! and hands finished [`CanvasEvent`]s to its [`EventListener`]. Form
//! XObjects re-enter the same loop with their own resources and an
//! implicit `q`/`Q`.
//!
//! Failure policy:
//! - malformed operands skip the operator (`MalformedOperator` warning);
//! - `Q` without a matching `q` is a no-op (`UnbalancedState` warning);
//! - `EMC` without a matching `BMC`/`BDC` is a silent no-op;
//! - unresolvable resources skip the dependent effect, except fonts, which
//!   fall back to default metrics;
//! - a truncated stream ends processing cleanly (`TruncatedContent`);
//! - listener errors abort immediately.
//!
//! With [`ProcessorOptions::strict_mode`] the first warning becomes an error.

use std::collections::HashMap;
use std::sync::Arc;

use pdfcanvas_core::image::{expand_color_space_name, expand_filter_name, expand_key_name};
use pdfcanvas_core::{
    CanvasTag, CanvasWarning, DashPattern, FillRule, ImageHandle, LineCap, LineJoin, Matrix,
    PaintOperation, PathBuilder, ProcessorOptions, TagHierarchy, WarningCode,
};

use crate::color_space::ColorSpace;
use crate::error::ProcessorError;
use crate::events::{CanvasEvent, ClipPathInfo, ImageRenderInfo, PathRenderInfo};
use crate::font::{FallbackFont, PdfFont};
use crate::graphics_state::{ClipPath, GraphicsState, GraphicsStateStack, TextRenderMode};
use crate::listener::EventListener;
use crate::resources::{FormXObject, ResourceProvider, XObject};
use crate::text_render::TextRenderInfo;
use crate::text_state::TextObjectState;
use crate::tokenizer::{ContentLexer, Operand, Operator, dict_get};

/// Why an operator handler stopped early.
enum OpFailure {
    /// Skip this operator and report the warning.
    Skip(CanvasWarning),
    /// Abort the content stream.
    Abort(ProcessorError),
}

impl From<ProcessorError> for OpFailure {
    fn from(err: ProcessorError) -> Self {
        OpFailure::Abort(err)
    }
}

type OpResult = Result<(), OpFailure>;

fn malformed(op: &Operator, detail: &str) -> OpFailure {
    OpFailure::Skip(CanvasWarning::new(
        WarningCode::MalformedOperator,
        format!("{} {detail}", op.name),
    ))
}

/// The last `N` operands as numbers. Extra leading operands are ignored.
fn numbers<const N: usize>(op: &Operator) -> Result<[f64; N], OpFailure> {
    let base = op
        .operands
        .len()
        .checked_sub(N)
        .ok_or_else(|| malformed(op, &format!("expects {N} operands")))?;
    let mut out = [0.0; N];
    for (slot, operand) in out.iter_mut().zip(&op.operands[base..]) {
        *slot = operand
            .as_f64()
            .ok_or_else(|| malformed(op, "expects numeric operands"))?;
    }
    Ok(out)
}

/// Lexer errors have a position but no operator.
fn at_index(mut warning: CanvasWarning, index: usize) -> CanvasWarning {
    warning.operator_index = Some(index);
    warning
}

fn number(op: &Operator) -> Result<f64, OpFailure> {
    numbers::<1>(op).map(|[v]| v)
}

fn name_at(op: &Operator, index: usize) -> Result<&str, OpFailure> {
    op.operands
        .get(index)
        .and_then(Operand::as_name)
        .ok_or_else(|| malformed(op, "expects a name operand"))
}

fn string_operand(op: &Operator) -> Result<&[u8], OpFailure> {
    op.operands
        .last()
        .and_then(Operand::as_bytes)
        .ok_or_else(|| malformed(op, "expects a string operand"))
}

/// Resources and font cache of the content stream being run.
struct StreamContext<'r> {
    resources: &'r dyn ResourceProvider,
    fonts: HashMap<String, Arc<dyn PdfFont>>,
    index: usize,
}

/// Drives a content stream and emits events to a listener.
///
/// One processor handles one page at a time; it is not shared between
/// threads.
pub struct CanvasProcessor<L: EventListener> {
    listener: L,
    options: ProcessorOptions,
    initial_state: GraphicsState,
    state: GraphicsStateStack,
    text: TextObjectState,
    path: PathBuilder,
    /// Rule of a `W`/`W*` waiting for the next painting operator.
    pending_clip: Option<FillRule>,
    tags: TagHierarchy,
    /// `EMC` never pops below this depth.
    tag_floor: usize,
    /// Keys of the forms currently executing, outermost first.
    form_stack: Vec<String>,
}

impl<L: EventListener> CanvasProcessor<L> {
    /// A processor whose initial state has the identity CTM.
    pub fn new(listener: L, options: ProcessorOptions) -> Self {
        Self::with_initial_state(listener, options, GraphicsState::default())
    }

    /// A processor starting from `initial`, typically
    /// [`GraphicsState::with_ctm`] with a page's default matrix.
    pub fn with_initial_state(
        listener: L,
        options: ProcessorOptions,
        initial: GraphicsState,
    ) -> Self {
        Self {
            listener,
            options,
            state: GraphicsStateStack::new(initial.clone()),
            initial_state: initial,
            text: TextObjectState::new(),
            path: PathBuilder::new(),
            pending_clip: None,
            tags: TagHierarchy::new(),
            tag_floor: 0,
            form_stack: Vec::new(),
        }
    }

    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    pub fn into_listener(self) -> L {
        self.listener
    }

    /// The live graphics state. Events carry their own frozen copies.
    pub fn graphics_state(&self) -> &GraphicsState {
        self.state.current()
    }

    /// Number of `q` frames currently saved.
    pub fn stack_depth(&self) -> usize {
        self.state.depth()
    }

    /// Discard all state and start over from the initial graphics state.
    pub fn reset(&mut self) {
        self.state = GraphicsStateStack::new(self.initial_state.clone());
        self.text = TextObjectState::new();
        self.path = PathBuilder::new();
        self.pending_clip = None;
        self.tags = TagHierarchy::new();
        self.tag_floor = 0;
        self.form_stack.clear();
    }

    /// Process one decoded content stream. State carries over between
    /// calls, so the streams of a page's `/Contents` array may be fed one
    /// by one.
    pub fn process_content(
        &mut self,
        content: &[u8],
        resources: &dyn ResourceProvider,
    ) -> Result<(), ProcessorError> {
        self.run_stream(content, resources)
    }

    fn run_stream(
        &mut self,
        content: &[u8],
        resources: &dyn ResourceProvider,
    ) -> Result<(), ProcessorError> {
        let mut ctx = StreamContext {
            resources,
            fonts: HashMap::new(),
            index: 0,
        };

        for (index, item) in ContentLexer::new(content).enumerate() {
            ctx.index = index;
            let op = match item {
                Ok(op) => op,
                Err(ProcessorError::Truncated(msg)) => {
                    self.warn(at_index(
                        CanvasWarning::new(WarningCode::TruncatedContent, msg),
                        index,
                    ))?;
                    break;
                }
                Err(ProcessorError::Parse(msg)) => {
                    self.warn(at_index(
                        CanvasWarning::new(WarningCode::MalformedOperator, msg),
                        index,
                    ))?;
                    continue;
                }
                Err(other) => return Err(other),
            };

            if index >= self.options.max_operators {
                self.warn(
                    CanvasWarning::new(
                        WarningCode::ResourceLimitReached,
                        format!(
                            "operator limit of {} reached, rest of stream skipped",
                            self.options.max_operators
                        ),
                    )
                    .at_operator(index, op.name.as_str()),
                )?;
                break;
            }

            match self.execute(&op, &mut ctx) {
                Ok(()) => {}
                Err(OpFailure::Skip(warning)) => {
                    self.warn(warning.at_operator(index, op.name.as_str()))?;
                }
                Err(OpFailure::Abort(err)) => return Err(err),
            }
        }
        Ok(())
    }

    fn execute(&mut self, op: &Operator, ctx: &mut StreamContext<'_>) -> OpResult {
        match op.name.as_str() {
            // General graphics state
            "q" => self.state.save(),
            "Q" => {
                if !self.state.restore() {
                    return Err(OpFailure::Skip(CanvasWarning::new(
                        WarningCode::UnbalancedState,
                        "Q without matching q",
                    )));
                }
            }
            "cm" => {
                let [a, b, c, d, e, f] = numbers::<6>(op)?;
                self.gs_mut().concat(&Matrix::new(a, b, c, d, e, f));
            }
            "w" => self.gs_mut().line_width = number(op)?,
            "J" => {
                let value = number(op)? as i64;
                self.gs_mut().line_cap =
                    LineCap::from_i64(value).ok_or_else(|| malformed(op, "line cap"))?;
            }
            "j" => {
                let value = number(op)? as i64;
                self.gs_mut().line_join =
                    LineJoin::from_i64(value).ok_or_else(|| malformed(op, "line join"))?;
            }
            "M" => self.gs_mut().miter_limit = number(op)?,
            "d" => self.set_dash(op)?,
            "ri" => self.gs_mut().rendering_intent = Some(name_at(op, 0)?.to_string()),
            "i" => self.gs_mut().flatness = number(op)?,
            "gs" => self.apply_ext_gstate(op, ctx)?,

            // Color
            "g" => self.set_device_color(false, ColorSpace::DeviceGray, op)?,
            "G" => self.set_device_color(true, ColorSpace::DeviceGray, op)?,
            "rg" => self.set_device_color(false, ColorSpace::DeviceRGB, op)?,
            "RG" => self.set_device_color(true, ColorSpace::DeviceRGB, op)?,
            "k" => self.set_device_color(false, ColorSpace::DeviceCMYK, op)?,
            "K" => self.set_device_color(true, ColorSpace::DeviceCMYK, op)?,
            "cs" => self.set_color_space(false, op, ctx)?,
            "CS" => self.set_color_space(true, op, ctx)?,
            "sc" | "scn" => self.set_color(false, op),
            "SC" | "SCN" => self.set_color(true, op),

            // Path construction
            "m" => {
                let [x, y] = numbers::<2>(op)?;
                self.path.move_to(x, y);
            }
            "l" => {
                let [x, y] = numbers::<2>(op)?;
                self.path.line_to(x, y);
            }
            "c" => {
                let [x1, y1, x2, y2, x3, y3] = numbers::<6>(op)?;
                self.path.curve_to(x1, y1, x2, y2, x3, y3);
            }
            "v" => {
                let [x2, y2, x3, y3] = numbers::<4>(op)?;
                self.path.curve_to_v(x2, y2, x3, y3);
            }
            "y" => {
                let [x1, y1, x3, y3] = numbers::<4>(op)?;
                self.path.curve_to_y(x1, y1, x3, y3);
            }
            "h" => {
                self.path.close_path();
            }
            "re" => {
                let [x, y, w, h] = numbers::<4>(op)?;
                self.path.rectangle(x, y, w, h);
            }

            // Path painting
            "S" => self.paint(PaintOperation::Stroke, FillRule::NonZeroWinding, false)?,
            "s" => self.paint(PaintOperation::Stroke, FillRule::NonZeroWinding, true)?,
            "f" | "F" => self.paint(PaintOperation::Fill, FillRule::NonZeroWinding, false)?,
            "f*" => self.paint(PaintOperation::Fill, FillRule::EvenOdd, false)?,
            "B" => self.paint(PaintOperation::FillStroke, FillRule::NonZeroWinding, false)?,
            "B*" => self.paint(PaintOperation::FillStroke, FillRule::EvenOdd, false)?,
            "b" => self.paint(PaintOperation::FillStroke, FillRule::NonZeroWinding, true)?,
            "b*" => self.paint(PaintOperation::FillStroke, FillRule::EvenOdd, true)?,
            "n" => self.paint(PaintOperation::NoOp, FillRule::NonZeroWinding, false)?,
            "W" => self.pending_clip = Some(FillRule::NonZeroWinding),
            "W*" => self.pending_clip = Some(FillRule::EvenOdd),

            // Text objects
            "BT" => {
                self.text.begin();
                self.emit(CanvasEvent::BeginText)?;
            }
            "ET" => {
                self.text.end();
                self.emit(CanvasEvent::EndText)?;
            }

            // Text state
            "Tf" => self.set_font(op, ctx)?,
            "Tc" => self.gs_mut().char_spacing = number(op)?,
            "Tw" => self.gs_mut().word_spacing = number(op)?,
            "Tz" => self.gs_mut().horizontal_scaling = number(op)?,
            "TL" => self.gs_mut().leading = number(op)?,
            "Ts" => self.gs_mut().rise = number(op)?,
            "Tr" => {
                let mode = number(op)? as i64;
                self.gs_mut().render_mode =
                    TextRenderMode::from_i64(mode).ok_or_else(|| malformed(op, "render mode"))?;
            }

            // Text positioning
            "Td" => {
                let [tx, ty] = numbers::<2>(op)?;
                self.text.move_text_position(tx, ty);
            }
            "TD" => {
                let [tx, ty] = numbers::<2>(op)?;
                self.gs_mut().leading = -ty;
                self.text.move_text_position(tx, ty);
            }
            "Tm" => {
                let [a, b, c, d, e, f] = numbers::<6>(op)?;
                self.text.set_matrix(Matrix::new(a, b, c, d, e, f));
            }
            "T*" => self.next_line(),

            // Text showing
            "Tj" => {
                let bytes = string_operand(op)?;
                self.show_string(bytes, op, ctx)?;
            }
            "TJ" => self.show_array(op, ctx)?,
            "'" => {
                let bytes = string_operand(op)?;
                self.next_line();
                self.show_string(bytes, op, ctx)?;
            }
            "\"" => {
                if op.operands.len() < 3 {
                    return Err(malformed(op, "expects 3 operands"));
                }
                let n = op.operands.len();
                let aw = op.operands[n - 3]
                    .as_f64()
                    .ok_or_else(|| malformed(op, "word spacing"))?;
                let ac = op.operands[n - 2]
                    .as_f64()
                    .ok_or_else(|| malformed(op, "char spacing"))?;
                let bytes = string_operand(op)?;
                let gs = self.gs_mut();
                gs.word_spacing = aw;
                gs.char_spacing = ac;
                self.next_line();
                self.show_string(bytes, op, ctx)?;
            }

            // XObjects and inline images
            "Do" => self.do_xobject(op, ctx)?,
            "BI" => self.inline_image(op)?,

            // Marked content
            "BMC" => {
                let role = name_at(op, 0)?;
                self.tags.push(CanvasTag::new(role));
            }
            "BDC" => self.begin_marked_content(op, ctx)?,
            "EMC" => {
                if self.tags.len() > self.tag_floor {
                    self.tags.pop();
                }
            }

            // Accepted without effect: marked-content points, compatibility
            // sections, Type3 glyph metrics and shadings.
            "MP" | "DP" | "BX" | "EX" | "d0" | "d1" | "sh" => {}

            _ => {}
        }
        Ok(())
    }

    fn gs_mut(&mut self) -> &mut GraphicsState {
        self.state.current_mut()
    }

    fn emit(&mut self, event: CanvasEvent) -> Result<(), ProcessorError> {
        self.listener.on_event(&event)
    }

    fn warn(&mut self, warning: CanvasWarning) -> Result<(), ProcessorError> {
        #[cfg(feature = "tracing")]
        tracing::warn!(code = warning.code.as_str(), "{}", warning);

        if self.options.strict_mode {
            return Err(ProcessorError::Core(warning.to_error()));
        }
        if self.options.collect_warnings {
            self.listener.on_warning(&warning);
        }
        Ok(())
    }

    fn warn_at(
        &mut self,
        ctx: &StreamContext<'_>,
        op: &Operator,
        code: WarningCode,
        description: impl Into<String>,
    ) -> Result<(), ProcessorError> {
        self.warn(CanvasWarning::new(code, description).at_operator(ctx.index, op.name.as_str()))
    }

    // --- graphics state ---

    fn set_dash(&mut self, op: &Operator) -> OpResult {
        let (Some(array), Some(phase)) = (
            op.operands.first().and_then(Operand::as_array),
            op.operands.get(1).and_then(Operand::as_f64),
        ) else {
            return Err(malformed(op, "expects [array] phase"));
        };
        let dashes = array
            .iter()
            .map(Operand::as_f64)
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| malformed(op, "dash array must be numeric"))?;
        self.gs_mut().dash_pattern = DashPattern::new(dashes, phase);
        Ok(())
    }

    fn apply_ext_gstate(&mut self, op: &Operator, ctx: &StreamContext<'_>) -> OpResult {
        let name = name_at(op, 0)?;
        match ctx.resources.ext_gstate(name) {
            Some(ext) => ext.apply_to(self.gs_mut()),
            None => self.warn_at(
                ctx,
                op,
                WarningCode::MissingResource,
                format!("ExtGState /{name} not found"),
            )?,
        }
        Ok(())
    }

    // --- color ---

    fn set_device_color(&mut self, stroke: bool, space: ColorSpace, op: &Operator) -> OpResult {
        let components: Vec<f32> = match space {
            ColorSpace::DeviceGray => numbers::<1>(op)?.iter().map(|&v| v as f32).collect(),
            ColorSpace::DeviceRGB => numbers::<3>(op)?.iter().map(|&v| v as f32).collect(),
            _ => numbers::<4>(op)?.iter().map(|&v| v as f32).collect(),
        };
        let color = space.resolve_color(&components);
        let gs = self.gs_mut();
        if stroke {
            gs.stroke_color_space = space;
            gs.stroke_color = color;
        } else {
            gs.fill_color_space = space;
            gs.fill_color = color;
        }
        Ok(())
    }

    fn set_color_space(&mut self, stroke: bool, op: &Operator, ctx: &StreamContext<'_>) -> OpResult {
        let name = name_at(op, 0)?;
        let space = match ColorSpace::from_device_name(name) {
            Some(space) => space,
            None => match ctx.resources.color_space(name) {
                Some(space) => space,
                None => {
                    self.warn_at(
                        ctx,
                        op,
                        WarningCode::MissingResource,
                        format!("color space /{name} not found"),
                    )?;
                    return Ok(());
                }
            },
        };
        let initial = space.initial_color();
        let gs = self.gs_mut();
        if stroke {
            gs.stroke_color_space = space;
            gs.stroke_color = initial;
        } else {
            gs.fill_color_space = space;
            gs.fill_color = initial;
        }
        Ok(())
    }

    fn set_color(&mut self, stroke: bool, op: &Operator) {
        let components: Vec<f32> = op
            .operands
            .iter()
            .filter_map(Operand::as_f64)
            .map(|v| v as f32)
            .collect();
        let pattern = op.operands.last().and_then(Operand::as_name);
        let gs = self.gs_mut();
        let space = if stroke {
            &gs.stroke_color_space
        } else {
            &gs.fill_color_space
        };
        let color = match pattern {
            Some(name) => space.resolve_pattern(name, &components),
            None => space.resolve_color(&components),
        };
        if stroke {
            gs.stroke_color = color;
        } else {
            gs.fill_color = color;
        }
    }

    // --- paths ---

    fn paint(&mut self, operation: PaintOperation, fill_rule: FillRule, close: bool) -> OpResult {
        if close {
            self.path.close_path();
        }
        let path = self.path.take();
        let clip = self.pending_clip.take();
        if path.is_empty() {
            return Ok(());
        }

        let info = PathRenderInfo::new(
            operation,
            fill_rule,
            clip,
            path.clone(),
            self.state.current(),
            self.tags.clone(),
        );
        self.emit(CanvasEvent::Path(info))?;

        if let Some(rule) = clip {
            let ctm = self.state.current().ctm;
            self.gs_mut().clip.push(Arc::new(ClipPath {
                path: path.clone(),
                fill_rule: rule,
                ctm,
            }));
            self.emit(CanvasEvent::ClipPathChanged(ClipPathInfo {
                path,
                fill_rule: rule,
                ctm,
            }))?;
        }
        Ok(())
    }

    // --- text ---

    fn next_line(&mut self) {
        let leading = self.state.current().leading;
        self.text.next_line(leading);
    }

    fn set_font(&mut self, op: &Operator, ctx: &mut StreamContext<'_>) -> OpResult {
        if op.operands.len() < 2 {
            return Err(malformed(op, "expects /name size"));
        }
        let name = name_at(op, op.operands.len() - 2)?;
        let size = number(op)?;

        let font = match ctx.fonts.get(name) {
            Some(font) => Arc::clone(font),
            None => {
                let font = match ctx.resources.font(name) {
                    Some(font) => font,
                    None => {
                        self.warn(
                            CanvasWarning::new(
                                WarningCode::MissingFont,
                                format!("font /{name} not found, using default metrics"),
                            )
                            .at_operator(ctx.index, op.name.as_str())
                            .with_font(name),
                        )?;
                        Arc::new(FallbackFont::new(name)) as Arc<dyn PdfFont>
                    }
                };
                ctx.fonts.insert(name.to_string(), Arc::clone(&font));
                font
            }
        };

        let gs = self.gs_mut();
        gs.font = Some(font);
        gs.font_name = Some(name.to_string());
        gs.font_size = size;
        Ok(())
    }

    /// Emit one text event for `bytes` and move the text matrix past it.
    fn show_string(&mut self, bytes: &[u8], op: &Operator, ctx: &StreamContext<'_>) -> OpResult {
        let Some(font) = self.state.current().font.clone() else {
            self.warn_at(
                ctx,
                op,
                WarningCode::MissingFont,
                "text shown before any Tf",
            )?;
            return Ok(());
        };
        let info = TextRenderInfo::new(
            bytes.to_vec(),
            self.state.snapshot(),
            font,
            self.text.text_matrix(),
            self.tags.clone(),
            self.options.unicode_norm,
        );
        let advance = info.unscaled_width();
        self.emit(CanvasEvent::Text(info))?;
        self.text.advance(advance);
        Ok(())
    }

    fn show_array(&mut self, op: &Operator, ctx: &StreamContext<'_>) -> OpResult {
        let elements = op
            .operands
            .last()
            .and_then(Operand::as_array)
            .ok_or_else(|| malformed(op, "expects an array"))?;
        for element in elements {
            if let Some(bytes) = element.as_bytes() {
                self.show_string(bytes, op, ctx)?;
            } else if let Some(adjust) = element.as_f64() {
                let gs = self.state.current();
                let tx = -adjust / 1000.0 * gs.font_size * gs.horizontal_scaling_factor();
                self.text.advance(tx);
            }
        }
        Ok(())
    }

    // --- images and forms ---

    fn do_xobject(&mut self, op: &Operator, ctx: &StreamContext<'_>) -> OpResult {
        let name = name_at(op, 0)?;
        match ctx.resources.xobject(name) {
            Some(XObject::Image(mut image)) => {
                if image.name.is_none() {
                    image.name = Some(name.to_string());
                }
                self.emit_image(image)?;
            }
            Some(XObject::Form(form)) => self.run_form(form, op, ctx)?,
            None => self.warn_at(
                ctx,
                op,
                WarningCode::MissingResource,
                format!("XObject /{name} not found"),
            )?,
        }
        Ok(())
    }

    fn emit_image(&mut self, image: ImageHandle) -> Result<(), ProcessorError> {
        let gs = self.state.current();
        let info = ImageRenderInfo {
            image: Arc::new(image),
            image_matrix: gs.ctm,
            fill_color: gs.fill_color.clone(),
            tags: self.tags.clone(),
        };
        self.emit(CanvasEvent::Image(info))
    }

    fn inline_image(&mut self, op: &Operator) -> OpResult {
        let (Some(dict), Some(data)) = (
            op.operands.first().and_then(Operand::as_dict),
            op.operands.get(1).and_then(Operand::as_bytes),
        ) else {
            return Err(malformed(op, "inline image without dictionary or data"));
        };
        self.emit_image(inline_image_handle(dict, data.to_vec()))?;
        Ok(())
    }

    fn run_form(
        &mut self,
        form: FormXObject<'_>,
        op: &Operator,
        ctx: &StreamContext<'_>,
    ) -> Result<(), ProcessorError> {
        if self.form_stack.len() >= self.options.max_recursion_depth {
            return self.warn_at(
                ctx,
                op,
                WarningCode::ResourceLimitReached,
                format!(
                    "form nesting deeper than {}, skipped",
                    self.options.max_recursion_depth
                ),
            );
        }
        if self.form_stack.contains(&form.key) {
            return self.warn_at(
                ctx,
                op,
                WarningCode::ResourceLimitReached,
                format!("form {} invokes itself, skipped", form.key),
            );
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            form = %form.key,
            depth = self.form_stack.len() + 1,
            "entering form XObject"
        );

        let frame = self.state.enter_nested();
        self.gs_mut().concat(&form.matrix);
        let saved_text = self.text;
        let saved_path = std::mem::take(&mut self.path);
        let saved_clip = self.pending_clip.take();
        let saved_tag_floor = std::mem::replace(&mut self.tag_floor, self.tags.len());
        self.form_stack.push(form.key.clone());

        let resources: &dyn ResourceProvider = match &form.resources {
            Some(own) => own.as_ref(),
            None => ctx.resources,
        };
        let result = self.run_stream(&form.content, resources);

        self.form_stack.pop();
        while self.tags.len() > self.tag_floor {
            self.tags.pop();
        }
        self.tag_floor = saved_tag_floor;
        self.pending_clip = saved_clip;
        self.path = saved_path;
        self.text = saved_text;
        self.state.leave_nested(frame);
        result
    }

    // --- marked content ---

    fn begin_marked_content(&mut self, op: &Operator, ctx: &StreamContext<'_>) -> OpResult {
        let role = name_at(op, 0)?;
        let tag = match op.operands.get(1) {
            Some(Operand::Dictionary(entries)) => tag_from_properties(role, entries),
            Some(Operand::Name(key)) => match ctx.resources.properties(key) {
                Some(entries) => tag_from_properties(role, &entries),
                None => {
                    self.warn_at(
                        ctx,
                        op,
                        WarningCode::MissingResource,
                        format!("property list /{key} not found"),
                    )?;
                    CanvasTag::new(role)
                }
            },
            _ => return Err(malformed(op, "expects a tag and a property list")),
        };
        self.tags.push(tag);
        Ok(())
    }
}

impl<L: EventListener> std::fmt::Debug for CanvasProcessor<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasProcessor")
            .field("options", &self.options)
            .field("stack_depth", &self.state.depth())
            .field("tags", &self.tags.len())
            .field("form_depth", &self.form_stack.len())
            .finish()
    }
}

fn tag_from_properties(role: &str, entries: &[(String, Operand)]) -> CanvasTag {
    let text = |key: &str| {
        dict_get(entries, key)
            .and_then(Operand::as_bytes)
            .map(decode_text_string)
    };
    let mut tag = CanvasTag::new(role);
    tag.mcid = dict_get(entries, "MCID").and_then(Operand::as_i64);
    tag.actual_text = text("ActualText");
    tag.expansion_text = text("E");
    tag.alternate_description = text("Alt");
    tag
}

/// Decode a PDF text string: UTF-16BE or UTF-8 with a byte order mark,
/// otherwise one byte per character.
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let (text, _) = encoding_rs::UTF_16BE.decode_without_bom_handling(rest);
        return text.into_owned();
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Build the handle of an inline image, expanding abbreviated keys and
/// values.
fn inline_image_handle(dict: &[(String, Operand)], data: Vec<u8>) -> ImageHandle {
    let dimension = |value: &Operand| value.as_i64().and_then(|v| u32::try_from(v).ok());
    let mut image = ImageHandle {
        data,
        is_inline: true,
        ..ImageHandle::default()
    };
    for (key, value) in dict {
        match expand_key_name(key) {
            "Width" => image.width = dimension(value).unwrap_or(0),
            "Height" => image.height = dimension(value).unwrap_or(0),
            "BitsPerComponent" => image.bits_per_component = dimension(value),
            "ImageMask" => image.image_mask = matches!(value, Operand::Boolean(true)),
            "ColorSpace" => {
                let name = match value {
                    Operand::Name(n) => Some(n.as_str()),
                    Operand::Array(items) => items.first().and_then(Operand::as_name),
                    _ => None,
                };
                image.color_space = name.map(|n| expand_color_space_name(n).to_string());
            }
            "Filter" => {
                image.filters = match value {
                    Operand::Name(n) => vec![expand_filter_name(n).to_string()],
                    Operand::Array(items) => items
                        .iter()
                        .filter_map(Operand::as_name)
                        .map(|n| expand_filter_name(n).to_string())
                        .collect(),
                    _ => Vec::new(),
                };
            }
            _ => {}
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventType;
    use crate::listener::EventCollector;
    use crate::resources::{ExtGState, MapResources};
    use pdfcanvas_core::{Color, Point};

    fn run(content: &[u8], resources: &MapResources) -> EventCollector {
        run_with(content, resources, ProcessorOptions::default())
    }

    fn run_with(
        content: &[u8],
        resources: &MapResources,
        options: ProcessorOptions,
    ) -> EventCollector {
        let mut processor = CanvasProcessor::new(EventCollector::new(), options);
        processor.process_content(content, resources).unwrap();
        processor.into_listener()
    }

    fn fonts() -> MapResources {
        MapResources::new().with_font("F1", Arc::new(FallbackFont::new("F1")))
    }

    fn paths(collector: &EventCollector) -> Vec<&PathRenderInfo> {
        collector
            .events
            .iter()
            .filter_map(|e| match e {
                CanvasEvent::Path(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    fn texts(collector: &EventCollector) -> Vec<&TextRenderInfo> {
        collector
            .events
            .iter()
            .filter_map(|e| match e {
                CanvasEvent::Text(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn begin_end_text_events() {
        let c = run(b"BT ET", &MapResources::new());
        let types: Vec<_> = c.events.iter().map(CanvasEvent::event_type).collect();
        assert_eq!(types, vec![EventType::BeginText, EventType::EndText]);
    }

    #[test]
    fn cm_is_captured_in_path_event() {
        let c = run(b"2 0 0 2 10 20 cm 0 0 m 5 0 l S", &MapResources::new());
        let p = paths(&c);
        assert_eq!(p.len(), 1);
        assert_eq!(p[0].ctm, Matrix::new(2.0, 0.0, 0.0, 2.0, 10.0, 20.0));
        assert_eq!(p[0].user_space_path().subpaths()[0].points()[1], Point::new(20.0, 20.0));
    }

    #[test]
    fn close_variants_close_before_painting() {
        let c = run(b"0 0 m 10 0 l 10 10 l s", &MapResources::new());
        let p = paths(&c);
        assert_eq!(p[0].operation, PaintOperation::Stroke);
        assert!(p[0].path.subpaths()[0].is_closed());
    }

    #[test]
    fn even_odd_operators_carry_rule() {
        let c = run(b"0 0 10 10 re f* 0 0 10 10 re B*", &MapResources::new());
        let p = paths(&c);
        assert_eq!(p[0].fill_rule, FillRule::EvenOdd);
        assert_eq!(p[1].operation, PaintOperation::FillStroke);
        assert_eq!(p[1].fill_rule, FillRule::EvenOdd);
    }

    #[test]
    fn clip_then_n_updates_state_and_emits_clip_event() {
        let mut processor = CanvasProcessor::new(EventCollector::new(), ProcessorOptions::default());
        processor
            .process_content(b"0 0 50 50 re W* n", &MapResources::new())
            .unwrap();
        assert_eq!(processor.graphics_state().clip.len(), 1);
        assert_eq!(processor.graphics_state().clip[0].fill_rule, FillRule::EvenOdd);

        let c = processor.into_listener();
        let types: Vec<_> = c.events.iter().map(CanvasEvent::event_type).collect();
        assert_eq!(types, vec![EventType::RenderPath, EventType::ClipPathChanged]);
        let p = paths(&c);
        assert!(p[0].is_clip_only());
        assert_eq!(p[0].clip_rule, Some(FillRule::EvenOdd));
    }

    #[test]
    fn clip_is_restored_by_q() {
        let mut processor = CanvasProcessor::new(EventCollector::new(), ProcessorOptions::default());
        processor
            .process_content(b"q 0 0 5 5 re W n Q", &MapResources::new())
            .unwrap();
        assert!(processor.graphics_state().clip.is_empty());
    }

    #[test]
    fn painting_without_path_emits_nothing() {
        let c = run(b"S f n", &MapResources::new());
        assert!(c.events.is_empty());
    }

    #[test]
    fn line_without_current_point_is_ignored() {
        let c = run(b"10 10 l 0 0 m 5 5 l S", &MapResources::new());
        let p = paths(&c);
        assert_eq!(p[0].path.subpaths().len(), 1);
        assert_eq!(p[0].path.subpaths()[0].points().len(), 2);
    }

    #[test]
    fn color_operators_set_current_frame_only() {
        let mut processor = CanvasProcessor::new(EventCollector::new(), ProcessorOptions::default());
        processor
            .process_content(b"1 0 0 rg q 0 0 1 RG 0.5 g Q", &MapResources::new())
            .unwrap();
        let gs = processor.graphics_state();
        assert_eq!(gs.fill_color, Color::Rgb(1.0, 0.0, 0.0));
        assert_eq!(gs.stroke_color, Color::black());
        assert_eq!(gs.fill_color_space, ColorSpace::DeviceRGB);
    }

    #[test]
    fn cs_resets_to_initial_color_and_scn_uses_space() {
        let mut processor = CanvasProcessor::new(EventCollector::new(), ProcessorOptions::default());
        processor
            .process_content(b"0.2 g /DeviceCMYK cs", &MapResources::new())
            .unwrap();
        assert_eq!(
            processor.graphics_state().fill_color,
            Color::Cmyk(0.0, 0.0, 0.0, 1.0)
        );
        processor
            .process_content(b"0 1 0 0 scn", &MapResources::new())
            .unwrap();
        assert_eq!(
            processor.graphics_state().fill_color,
            Color::Cmyk(0.0, 1.0, 0.0, 0.0)
        );
    }

    #[test]
    fn pattern_color_keeps_name() {
        let mut processor = CanvasProcessor::new(EventCollector::new(), ProcessorOptions::default());
        processor
            .process_content(b"/Pattern cs /P0 scn", &MapResources::new())
            .unwrap();
        assert_eq!(
            processor.graphics_state().fill_color,
            Color::Pattern {
                name: "P0".to_string(),
                components: Vec::new()
            }
        );
    }

    #[test]
    fn unknown_color_space_warns() {
        let c = run(b"/CS9 cs", &MapResources::new());
        assert_eq!(c.warnings.len(), 1);
        assert_eq!(c.warnings[0].code, WarningCode::MissingResource);
        assert_eq!(c.warnings[0].operator.as_deref(), Some("cs"));
    }

    #[test]
    fn line_style_operators() {
        let mut processor = CanvasProcessor::new(EventCollector::new(), ProcessorOptions::default());
        processor
            .process_content(b"3 w 1 J 2 j 4 M [2 1] 0.5 d", &MapResources::new())
            .unwrap();
        let gs = processor.graphics_state();
        assert_eq!(gs.line_width, 3.0);
        assert_eq!(gs.line_cap, LineCap::Round);
        assert_eq!(gs.line_join, LineJoin::Bevel);
        assert_eq!(gs.miter_limit, 4.0);
        assert_eq!(gs.dash_pattern, DashPattern::new(vec![2.0, 1.0], 0.5));
    }

    #[test]
    fn gs_applies_ext_gstate() {
        let res = MapResources::new().with_ext_gstate(
            "GS0",
            ExtGState {
                line_width: Some(4.0),
                stroke_alpha: Some(0.25),
                ..ExtGState::default()
            },
        );
        let mut processor = CanvasProcessor::new(EventCollector::new(), ProcessorOptions::default());
        processor.process_content(b"/GS0 gs /GS1 gs", &res).unwrap();
        assert_eq!(processor.graphics_state().line_width, 4.0);
        assert_eq!(processor.graphics_state().stroke_alpha, 0.25);
        let c = processor.into_listener();
        assert_eq!(c.warnings.len(), 1);
        assert_eq!(c.warnings[0].code, WarningCode::MissingResource);
    }

    #[test]
    fn malformed_operator_is_skipped_with_warning() {
        let c = run(b"/X 0 m 0 0 m 1 1 l S", &MapResources::new());
        assert_eq!(paths(&c).len(), 1);
        assert_eq!(c.warnings[0].code, WarningCode::MalformedOperator);
        assert_eq!(c.warnings[0].operator_index, Some(0));
    }

    #[test]
    fn unbalanced_q_warns_and_continues() {
        let c = run(b"Q 0 0 m 1 1 l S", &MapResources::new());
        assert_eq!(c.warnings[0].code, WarningCode::UnbalancedState);
        assert_eq!(paths(&c).len(), 1);
    }

    #[test]
    fn missing_font_uses_fallback() {
        let c = run(b"BT /F9 10 Tf (ab) Tj ET", &MapResources::new());
        let t = texts(&c);
        assert_eq!(t.len(), 1);
        // 600 units default width
        assert!((t[0].unscaled_width() - 12.0).abs() < 1e-9);
        assert_eq!(c.warnings[0].code, WarningCode::MissingFont);
        assert_eq!(c.warnings[0].font_name.as_deref(), Some("F9"));
    }

    #[test]
    fn text_before_tf_is_dropped() {
        let c = run(b"BT (ab) Tj ET", &MapResources::new());
        assert!(texts(&c).is_empty());
        assert_eq!(c.warnings[0].code, WarningCode::MissingFont);
    }

    #[test]
    fn tj_advances_text_matrix() {
        let c = run(b"BT /F1 10 Tf 100 200 Td (ab) Tj (c) Tj ET", &fonts());
        let t = texts(&c);
        assert_eq!(t[0].text_matrix(), Matrix::translation(100.0, 200.0));
        assert_eq!(t[1].text_matrix(), Matrix::translation(112.0, 200.0));
    }

    #[test]
    fn tj_array_numbers_adjust_position() {
        let c = run(b"BT /F1 10 Tf 50 Tz [(a) 500 (b)] TJ ET", &fonts());
        let t = texts(&c);
        // (6 - 5) * 0.5
        assert!((t[1].text_matrix().e - 0.5).abs() < 1e-9);
    }

    #[test]
    fn quote_operators_move_to_next_line() {
        let c = run(
            b"BT /F1 10 Tf 12 TL 0 100 Td (a) ' 3 1 (b) \" ET",
            &fonts(),
        );
        let t = texts(&c);
        assert_eq!(t[0].text_matrix(), Matrix::translation(0.0, 88.0));
        assert_eq!(t[1].text_matrix(), Matrix::translation(0.0, 76.0));
        assert_eq!(t[1].graphics_state().word_spacing, 3.0);
        assert_eq!(t[1].graphics_state().char_spacing, 1.0);
    }

    #[test]
    fn td_uppercase_sets_leading() {
        let c = run(b"BT /F1 10 Tf 0 -14 TD T* (a) Tj ET", &fonts());
        let t = texts(&c);
        assert_eq!(t[0].text_matrix().f, -28.0);
        assert_eq!(t[0].graphics_state().leading, 14.0);
    }

    #[test]
    fn text_state_operators() {
        let c = run(b"BT /F1 8 Tf 1 Tc 2 Tw 80 Tz 3 Ts 3 Tr (a) Tj ET", &fonts());
        let gs = texts(&c)[0].graphics_state().clone();
        assert_eq!(gs.font_size, 8.0);
        assert_eq!(gs.char_spacing, 1.0);
        assert_eq!(gs.word_spacing, 2.0);
        assert_eq!(gs.horizontal_scaling, 80.0);
        assert_eq!(gs.rise, 3.0);
        assert_eq!(gs.render_mode, TextRenderMode::Invisible);
    }

    #[test]
    fn bt_resets_text_matrix() {
        let c = run(b"BT /F1 10 Tf 5 5 Td ET BT (a) Tj ET", &fonts());
        assert!(texts(&c)[0].text_matrix().is_identity());
    }

    #[test]
    fn bdc_with_named_properties() {
        let res = fonts().with_properties(
            "MC0",
            vec![
                ("MCID".to_string(), Operand::Integer(7)),
                (
                    "ActualText".to_string(),
                    Operand::LiteralString(vec![0xFE, 0xFF, 0x00, 0x66, 0x00, 0x69]),
                ),
            ],
        );
        let c = run(b"/Span /MC0 BDC BT /F1 10 Tf (x) Tj ET EMC", &res);
        let t = texts(&c);
        assert_eq!(t[0].mcid(), Some(7));
        assert_eq!(t[0].actual_text(), Some("fi"));
    }

    #[test]
    fn bdc_inline_expansion_and_alt() {
        let c = run(
            b"/Span <</E (Doctor) /Alt (abbr)>> BDC 0 0 m 1 1 l S EMC",
            &MapResources::new(),
        );
        let p = paths(&c);
        let tag = p[0].tags.innermost().unwrap();
        assert_eq!(tag.expansion_text.as_deref(), Some("Doctor"));
        assert_eq!(tag.alternate_description.as_deref(), Some("abbr"));
        assert_eq!(p[0].mcid(), None);
    }

    #[test]
    fn bdc_missing_properties_keeps_role() {
        let c = run(b"/P /MC9 BDC 0 0 m 1 1 l S EMC", &MapResources::new());
        assert_eq!(paths(&c)[0].tags.innermost().unwrap().role, "P");
        assert_eq!(c.warnings[0].code, WarningCode::MissingResource);
    }

    #[test]
    fn extra_emc_is_silent() {
        let c = run(b"EMC EMC 0 0 m 1 1 l S", &MapResources::new());
        assert!(c.warnings.is_empty());
        assert_eq!(paths(&c).len(), 1);
    }

    #[test]
    fn image_xobject_uses_ctm() {
        let res = MapResources::new().with_image(
            "Im1",
            ImageHandle {
                width: 8,
                height: 4,
                filters: vec!["DCTDecode".to_string()],
                data: vec![1, 2, 3],
                ..ImageHandle::default()
            },
        );
        let c = run(b"q 80 0 0 40 10 10 cm /Im1 Do Q", &res);
        let CanvasEvent::Image(info) = &c.events[0] else {
            panic!("expected image event");
        };
        assert_eq!(info.image_matrix, Matrix::new(80.0, 0.0, 0.0, 40.0, 10.0, 10.0));
        assert_eq!(info.image.name.as_deref(), Some("Im1"));
        assert_eq!(info.image.data, vec![1, 2, 3]);
        assert!(!info.is_inline());
    }

    #[test]
    fn missing_xobject_emits_nothing() {
        let c = run(b"/Nope Do", &MapResources::new());
        assert!(c.events.is_empty());
        assert_eq!(c.warnings[0].code, WarningCode::MissingResource);
    }

    #[test]
    fn inline_image_keys_are_expanded() {
        let c = run(
            b"q 4 0 0 2 0 0 cm BI /W 2 /H 1 /CS /RGB /BPC 8 /F /AHx ID 00ff00ff00ff> EI Q",
            &MapResources::new(),
        );
        let CanvasEvent::Image(info) = &c.events[0] else {
            panic!("expected image event");
        };
        assert!(info.is_inline());
        assert_eq!(info.image.width, 2);
        assert_eq!(info.image.height, 1);
        assert_eq!(info.image.color_space.as_deref(), Some("DeviceRGB"));
        assert_eq!(info.image.filters, vec!["ASCIIHexDecode".to_string()]);
        assert_eq!(info.image.bits_per_component, Some(8));
        assert_eq!(info.image_matrix, Matrix::new(4.0, 0.0, 0.0, 2.0, 0.0, 0.0));
    }

    #[test]
    fn oversized_inline_image_still_emits() {
        let c = run(
            b"BI /W 4294967295 /H 4294967295 /BPC 8 /CS /RGB ID \x00 EI 0 0 m 1 1 l S",
            &MapResources::new(),
        );
        assert_eq!(c.events.len(), 2);
        let CanvasEvent::Image(info) = &c.events[0] else {
            panic!("expected image event");
        };
        assert_eq!(info.image.width, u32::MAX);
        assert_eq!(info.image.data, vec![0]);
        assert_eq!(c.events[1].event_type(), EventType::RenderPath);
    }

    #[test]
    fn form_runs_with_matrix_and_restores_state() {
        let res = MapResources::new().with_form(
            "Fm1",
            b"5 w 0 0 m 1 0 l S".to_vec(),
            Matrix::translation(100.0, 0.0),
        );
        let mut processor = CanvasProcessor::new(EventCollector::new(), ProcessorOptions::default());
        processor.process_content(b"/Fm1 Do 0 0 m 1 0 l S", &res).unwrap();
        assert_eq!(processor.graphics_state().line_width, 1.0);
        assert_eq!(processor.stack_depth(), 0);
        let c = processor.into_listener();
        let p = paths(&c);
        assert_eq!(p[0].ctm, Matrix::translation(100.0, 0.0));
        assert_eq!(p[0].line_width, 5.0);
        assert!(p[1].ctm.is_identity());
    }

    #[test]
    fn form_cannot_pop_caller_state() {
        let res = MapResources::new().with_form("Fm1", b"Q Q".to_vec(), Matrix::identity());
        let mut processor = CanvasProcessor::new(EventCollector::new(), ProcessorOptions::default());
        processor.process_content(b"q 7 w /Fm1 Do", &res).unwrap();
        assert_eq!(processor.graphics_state().line_width, 7.0);
        assert_eq!(processor.stack_depth(), 1);
        let c = processor.into_listener();
        assert_eq!(c.warnings.len(), 2);
    }

    #[test]
    fn form_uses_own_resources() {
        let inner = MapResources::new().with_font("F2", Arc::new(FallbackFont::new("Inner")));
        let res = MapResources::new().with_form_resources(
            "Fm1",
            b"BT /F2 10 Tf (a) Tj ET".to_vec(),
            Matrix::identity(),
            inner,
        );
        let c = run(b"/Fm1 Do", &res);
        assert!(c.warnings.is_empty());
        assert_eq!(texts(&c)[0].font().name(), "Inner");
    }

    #[test]
    fn self_referencing_form_is_skipped() {
        let res = MapResources::new().with_form(
            "Fm1",
            b"0 0 m 1 1 l S /Fm1 Do".to_vec(),
            Matrix::identity(),
        );
        let c = run(b"/Fm1 Do", &res);
        assert_eq!(paths(&c).len(), 1);
        assert_eq!(c.warnings.len(), 1);
        assert_eq!(c.warnings[0].code, WarningCode::ResourceLimitReached);
    }

    #[test]
    fn form_depth_is_capped() {
        let res = MapResources::new()
            .with_form("A", b"0 0 m 1 1 l S /B Do".to_vec(), Matrix::identity())
            .with_form("B", b"0 0 m 1 1 l S /C Do".to_vec(), Matrix::identity())
            .with_form("C", b"0 0 m 1 1 l S".to_vec(), Matrix::identity());
        let options = ProcessorOptions {
            max_recursion_depth: 2,
            ..ProcessorOptions::default()
        };
        let c = run_with(b"/A Do", &res, options);
        assert_eq!(paths(&c).len(), 2);
        assert_eq!(c.warnings[0].code, WarningCode::ResourceLimitReached);
    }

    #[test]
    fn marked_content_inside_form_is_balanced() {
        let res = MapResources::new().with_form(
            "Fm1",
            b"/Artifact BMC EMC EMC /Span BMC".to_vec(),
            Matrix::identity(),
        );
        let c = run(b"/P <</MCID 1>> BDC /Fm1 Do 0 0 m 1 1 l S EMC", &res);
        let p = paths(&c);
        assert_eq!(p[0].tags.len(), 1);
        assert_eq!(p[0].mcid(), Some(1));
    }

    #[test]
    fn truncated_stream_keeps_earlier_events() {
        let c = run(b"0 0 m 1 1 l S (unterminated", &MapResources::new());
        assert_eq!(paths(&c).len(), 1);
        assert_eq!(c.warnings.len(), 1);
        assert_eq!(c.warnings[0].code, WarningCode::TruncatedContent);
    }

    #[test]
    fn operator_limit_stops_stream() {
        let options = ProcessorOptions {
            max_operators: 3,
            ..ProcessorOptions::default()
        };
        let c = run_with(b"0 0 m 1 1 l S 0 0 m 2 2 l S", &MapResources::new(), options);
        assert_eq!(paths(&c).len(), 1);
        assert_eq!(c.warnings[0].code, WarningCode::ResourceLimitReached);
    }

    #[test]
    fn strict_mode_escalates_first_warning() {
        let options = ProcessorOptions {
            strict_mode: true,
            ..ProcessorOptions::default()
        };
        let mut processor = CanvasProcessor::new(EventCollector::new(), options);
        let err = processor
            .process_content(b"Q 0 0 m 1 1 l S", &MapResources::new())
            .unwrap_err();
        assert!(matches!(err, ProcessorError::Core(_)));
        assert!(processor.listener().events.is_empty());
    }

    #[test]
    fn warnings_can_be_suppressed() {
        let options = ProcessorOptions {
            collect_warnings: false,
            ..ProcessorOptions::default()
        };
        let c = run_with(b"Q", &MapResources::new(), options);
        assert!(c.warnings.is_empty());
    }

    #[test]
    fn reset_restores_initial_state() {
        let initial = GraphicsState::with_ctm(Matrix::translation(0.0, 792.0));
        let mut processor = CanvasProcessor::with_initial_state(
            EventCollector::new(),
            ProcessorOptions::default(),
            initial.clone(),
        );
        processor
            .process_content(b"q 2 w 1 0 0 rg /P BMC", &MapResources::new())
            .unwrap();
        processor.reset();
        assert_eq!(processor.graphics_state(), &initial);
        assert_eq!(processor.stack_depth(), 0);
    }

    #[test]
    fn text_string_decoding() {
        assert_eq!(decode_text_string(b"plain"), "plain");
        assert_eq!(decode_text_string(&[0xFE, 0xFF, 0x00, 0x41, 0x00, 0xE9]), "A\u{e9}");
        assert_eq!(decode_text_string(&[0xEF, 0xBB, 0xBF, b'o', b'k']), "ok");
        assert_eq!(decode_text_string(&[0xE9]), "\u{e9}");
    }
}
