//! GDSII export and import of mask layouts.
//!
//! Libraries are written with a database unit of 1 nm and a user unit of
//! 1 um, and only libraries with a 1 nm database unit are read back.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use derivative::Derivative;
use gds21::GdsElement;
use slotmap::SecondaryMap;
use tftgeom::orientation::Orientation;
use tftgeom::{Corner, Point, Polygon, Rect, Shape};

use crate::data::{MaskCtx, MaskData};
use crate::deps::arcstr::ArcStr;
use crate::error::{with_err_context, ErrorContext, Result};
use crate::layout::cell::{Cell, CellKey, Element, Instance, TextElement};
use crate::layout::error::{ConvStep, LayoutError, LayoutResult};
use crate::layout::layers::GdsLayerSpec;
use crate::log;

const DB_UNIT: f64 = 1e-9;
const USER_UNIT: f64 = 1e-3;

impl MaskCtx {
    /// Writes every cell in the context to a GDS file.
    pub fn to_gds(&self, path: impl AsRef<Path>) -> Result<()> {
        self.save_gds(None, path.as_ref())
    }

    /// Writes `top` and every cell it instantiates to a GDS file.
    ///
    /// `top` keeps its name; any other cell with the same name is renamed.
    pub fn to_gds_with_top(&self, top: Arc<Cell>, path: impl AsRef<Path>) -> Result<()> {
        self.save_gds(Some(top), path.as_ref())
    }

    fn save_gds(&self, top: Option<Arc<Cell>>, path: &Path) -> Result<()> {
        let library = {
            let data = self.read();
            GdsWriter::new(&data, top).library()?
        };
        with_err_context(library.save(path).map_err(LayoutError::from), || {
            ErrorContext::CreateFile(path.to_path_buf())
        })
    }

    /// Reads every structure of a GDS file into the context.
    ///
    /// Returns the new cells keyed by their names in the file. Cells whose
    /// names clash with existing cells are renamed in the context.
    pub fn from_gds(&self, path: impl AsRef<Path>) -> Result<HashMap<ArcStr, Arc<Cell>>> {
        let path = path.as_ref();
        let library = with_err_context(
            gds21::GdsLibrary::load(path).map_err(LayoutError::from),
            || ErrorContext::ReadFile(path.to_path_buf()),
        )?;

        let mut data = self.write();
        let mut reader = GdsReader::new(&mut data);
        with_err_context(reader.read_library(&library), || {
            ErrorContext::ParseFile(path.to_path_buf())
        })?;
        if reader.skipped > 0 {
            log::warn!(
                "skipped {} path or node elements in {:?}",
                reader.skipped,
                path
            );
        }
        Ok(reader.cells)
    }
}

#[derive(Derivative)]
#[derivative(Debug)]
struct GdsWriter<'a> {
    #[derivative(Debug = "ignore")]
    data: &'a MaskData,
    steps: Vec<ConvStep>,
    cells: Vec<Arc<Cell>>,
    names: SecondaryMap<CellKey, ArcStr>,
}

impl<'a> GdsWriter<'a> {
    fn new(data: &'a MaskData, top: Option<Arc<Cell>>) -> Self {
        let reachable = top.as_ref().map(reachable_from);
        let cells: Vec<Arc<Cell>> = data
            .layouts()
            .cells()
            .filter(|cell| {
                reachable
                    .as_ref()
                    .map_or(true, |set| set.contains(&cell.id()))
            })
            .cloned()
            .collect();

        let mut used = HashSet::new();
        if let Some(top) = &top {
            used.insert(top.name().clone());
        }
        let mut names = SecondaryMap::new();
        for cell in &cells {
            let is_top = top.as_ref().map_or(false, |top| top.id() == cell.id());
            let name = if is_top {
                cell.name().clone()
            } else {
                unique_name(cell.name(), &mut used)
            };
            names.insert(cell.id(), name);
        }

        Self {
            data,
            steps: Vec::new(),
            cells,
            names,
        }
    }

    fn library(mut self) -> LayoutResult<gds21::GdsLibrary> {
        self.steps.push(ConvStep::Library);
        let mut library = gds21::GdsLibrary::new("TOP");
        library.units = gds21::GdsUnits::new(USER_UNIT, DB_UNIT);

        let cells = std::mem::take(&mut self.cells);
        for cell in &cells {
            library.structs.push(self.structure(cell)?);
        }
        log::debug!(
            "exported {} of {} cells",
            cells.len(),
            self.data.layouts().cells().count()
        );
        self.steps.pop();
        Ok(library)
    }

    fn structure(&mut self, cell: &Arc<Cell>) -> LayoutResult<gds21::GdsStruct> {
        self.steps.push(ConvStep::Cell(cell.name().clone()));
        let mut strukt = gds21::GdsStruct::new(self.name_of(cell)?.as_str());

        for inst in cell.insts() {
            strukt.elems.push(self.struct_ref(inst)?.into());
        }

        self.steps.push(ConvStep::Geometry);
        for elem in cell.elems() {
            strukt.elems.push(self.boundary(elem)?.into());
        }
        self.steps.pop();

        self.steps.push(ConvStep::Annotations);
        for text in cell.annotations() {
            strukt.elems.push(self.label(text)?.into());
        }
        self.steps.pop();

        self.steps.pop();
        Ok(strukt)
    }

    fn struct_ref(&mut self, inst: &Instance) -> LayoutResult<gds21::GdsStructRef> {
        self.steps.push(ConvStep::Instance(inst.cell().name().clone()));
        let sref = gds21::GdsStructRef {
            name: self.name_of(inst.cell())?.as_str().into(),
            xy: gds_point(inst.loc())?,
            strans: inst.orientation().into(),
            ..Default::default()
        };
        self.steps.pop();
        Ok(sref)
    }

    fn boundary(&self, elem: &Element) -> LayoutResult<gds21::GdsBoundary> {
        let vertices: Vec<Point> = match &elem.inner {
            Shape::Rect(rect) => [
                Corner::LowerLeft,
                Corner::LowerRight,
                Corner::UpperRight,
                Corner::UpperLeft,
            ]
            .into_iter()
            .map(|corner| rect.corner(corner))
            .collect(),
            Shape::Polygon(poly) => poly.points.clone(),
        };
        if vertices.len() < 3 {
            return Err(self.err(format!(
                "polygon with {} vertices on layer {}/{}",
                vertices.len(),
                elem.layer.0,
                elem.layer.1
            )));
        }

        let mut xy = vertices
            .into_iter()
            .map(gds_point)
            .collect::<LayoutResult<Vec<_>>>()?;
        // Boundaries repeat their first vertex.
        xy.push(xy[0].clone());

        let spec = gds21::GdsLayerSpec::from(elem.layer);
        Ok(gds21::GdsBoundary {
            layer: spec.layer,
            datatype: spec.xtype,
            xy,
            ..Default::default()
        })
    }

    fn label(&self, text: &TextElement) -> LayoutResult<gds21::GdsTextElem> {
        let spec = gds21::GdsLayerSpec::from(text.layer);
        Ok(gds21::GdsTextElem {
            string: text.string.as_str().into(),
            layer: spec.layer,
            texttype: spec.xtype,
            xy: gds_point(text.loc)?,
            ..Default::default()
        })
    }

    fn name_of(&self, cell: &Arc<Cell>) -> LayoutResult<ArcStr> {
        self.names
            .get(cell.id())
            .cloned()
            .ok_or_else(|| self.err(format!("cell `{}` is not being exported", cell.name())))
    }

    fn err(&self, message: impl Into<String>) -> LayoutError {
        LayoutError::Export {
            message: message.into(),
            steps: self.steps.clone(),
        }
    }
}

/// Collects `top` and every cell below it.
fn reachable_from(top: &Arc<Cell>) -> HashSet<CellKey> {
    let mut seen = HashSet::from([top.id()]);
    let mut stack = vec![top.clone()];
    while let Some(cell) = stack.pop() {
        for inst in cell.insts() {
            if seen.insert(inst.cell().id()) {
                stack.push(inst.cell().clone());
            }
        }
    }
    seen
}

/// Returns `name`, or `name_<n>` for the smallest `n` not yet in `used`.
fn unique_name(name: &ArcStr, used: &mut HashSet<ArcStr>) -> ArcStr {
    let mut candidate = name.clone();
    let mut n = 1;
    while used.contains(&candidate) {
        candidate = arcstr::format!("{name}_{n}");
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}

fn gds_point(pt: Point) -> LayoutResult<gds21::GdsPoint> {
    Ok(gds21::GdsPoint::new(pt.x.try_into()?, pt.y.try_into()?))
}

fn point(pt: &gds21::GdsPoint) -> Point {
    Point::new(pt.x.into(), pt.y.into())
}

/// Orders the structures of `library` so that each follows everything it instantiates.
///
/// Independent structures keep their order in the file.
fn dependency_order(library: &gds21::GdsLibrary) -> LayoutResult<Vec<&gds21::GdsStruct>> {
    let by_name: HashMap<String, &gds21::GdsStruct> = library
        .structs
        .iter()
        .map(|strukt| (strukt.name.to_string(), strukt))
        .collect();
    let mut seen = HashSet::new();
    let mut order = Vec::with_capacity(library.structs.len());
    for strukt in &library.structs {
        visit(strukt, &by_name, &mut seen, &mut order)?;
    }
    Ok(order)
}

fn visit<'a>(
    strukt: &'a gds21::GdsStruct,
    by_name: &HashMap<String, &'a gds21::GdsStruct>,
    seen: &mut HashSet<String>,
    order: &mut Vec<&'a gds21::GdsStruct>,
) -> LayoutResult<()> {
    if !seen.insert(strukt.name.to_string()) {
        return Ok(());
    }
    for elem in &strukt.elems {
        let dep = match elem {
            GdsElement::GdsStructRef(sref) => sref.name.to_string(),
            GdsElement::GdsArrayRef(aref) => aref.name.to_string(),
            _ => continue,
        };
        let dep = by_name
            .get(&dep)
            .copied()
            .ok_or(LayoutError::UndefinedStruct(dep))?;
        visit(dep, by_name, seen, order)?;
    }
    order.push(strukt);
    Ok(())
}

/// Recognizes four vertices tracing an axis-aligned rectangle in either direction.
fn as_rect(vertices: &[Point]) -> Option<Rect> {
    let [a, b, c, d] = vertices else {
        return None;
    };
    let vertical_first = a.x == b.x && b.y == c.y && c.x == d.x && d.y == a.y;
    let horizontal_first = a.y == b.y && b.x == c.x && c.y == d.y && d.x == a.x;
    (vertical_first || horizontal_first).then(|| Rect::new(*a, *c))
}

struct GdsReader<'a> {
    data: &'a mut MaskData,
    steps: Vec<ConvStep>,
    skipped: usize,
    cells: HashMap<ArcStr, Arc<Cell>>,
}

impl<'a> GdsReader<'a> {
    fn new(data: &'a mut MaskData) -> Self {
        Self {
            data,
            steps: Vec::new(),
            skipped: 0,
            cells: HashMap::new(),
        }
    }

    fn read_library(&mut self, library: &gds21::GdsLibrary) -> LayoutResult<()> {
        self.steps.push(ConvStep::Library);

        self.steps.push(ConvStep::Units);
        let db_unit = library.units.db_unit();
        if (db_unit - DB_UNIT).abs() > 1e-12 {
            return Err(self.err(format!("database unit of {db_unit:.3e} m, expected 1 nm")));
        }
        self.steps.pop();

        for strukt in dependency_order(library)? {
            self.read_struct(strukt)?;
        }
        self.steps.pop();
        Ok(())
    }

    fn read_struct(&mut self, strukt: &gds21::GdsStruct) -> LayoutResult<()> {
        let name = ArcStr::from(strukt.name.to_string());
        if self.cells.contains_key(&name) {
            return Err(self.err(format!("structure `{name}` is defined more than once")));
        }
        self.steps.push(ConvStep::Cell(name.clone()));

        let mut cell = Cell::new(self.data.layouts_mut().gen_id());
        cell.set_name(self.data.layouts().alloc_name(name.clone()));
        for elem in &strukt.elems {
            match elem {
                GdsElement::GdsBoundary(boundary) => cell.add(self.boundary(boundary)?),
                GdsElement::GdsBox(gds_box) => cell.add(Element::new(
                    GdsLayerSpec(gds_box.layer, gds_box.boxtype),
                    // Boxes store five points; the first and third are opposite corners.
                    Rect::new(point(&gds_box.xy[0]), point(&gds_box.xy[2])),
                )),
                GdsElement::GdsStructRef(sref) => cell.add_inst(self.struct_ref(sref)?),
                GdsElement::GdsArrayRef(aref) => cell.add_instances(self.array_ref(aref)?),
                GdsElement::GdsTextElem(text) => cell.add_annotation(TextElement {
                    string: ArcStr::from(text.string.to_string()),
                    loc: point(&text.xy),
                    layer: GdsLayerSpec(text.layer, text.texttype),
                }),
                _ => self.skipped += 1,
            }
        }
        cell.freeze();

        self.steps.pop();
        let cell = self.data.layouts_mut().set_cell(cell);
        self.cells.insert(name, cell);
        Ok(())
    }

    fn boundary(&self, boundary: &gds21::GdsBoundary) -> LayoutResult<Element> {
        let mut vertices: Vec<Point> = boundary.xy.iter().map(point).collect();
        if vertices.len() < 4 || vertices.first() != vertices.last() {
            return Err(self.err("boundary does not end at its first vertex"));
        }
        vertices.pop();
        let layer = GdsLayerSpec(boundary.layer, boundary.datatype);
        Ok(match as_rect(&vertices) {
            Some(rect) => Element::new(layer, rect),
            None => Element::new(layer, Polygon::new(vertices)),
        })
    }

    fn cell(&self, name: &ArcStr) -> LayoutResult<Arc<Cell>> {
        self.cells
            .get(name)
            .cloned()
            .ok_or_else(|| LayoutError::UndefinedStruct(name.to_string()))
    }

    fn struct_ref(&mut self, sref: &gds21::GdsStructRef) -> LayoutResult<Instance> {
        let name = ArcStr::from(sref.name.to_string());
        self.steps.push(ConvStep::Instance(name.clone()));
        let mut inst = Instance::new(self.cell(&name)?);
        inst.set_loc(point(&sref.xy));
        if let Some(strans) = &sref.strans {
            inst.set_orientation(self.orientation(strans)?);
        }
        self.steps.pop();
        Ok(inst)
    }

    /// Expands an array reference into one instance per element.
    ///
    /// Elements are named `{cell}[{col}][{row}]`.
    fn array_ref(&mut self, aref: &gds21::GdsArrayRef) -> LayoutResult<Vec<Instance>> {
        let name = ArcStr::from(aref.name.to_string());
        self.steps.push(ConvStep::Array(name.clone()));
        let cell = self.cell(&name)?;

        let (cols, rows) = (i64::from(aref.cols), i64::from(aref.rows));
        if cols <= 0 || rows <= 0 {
            return Err(self.err(format!("{cols} x {rows} array")));
        }
        let origin = point(&aref.xy[0]);
        let col_end = point(&aref.xy[1]);
        let row_end = point(&aref.xy[2]);
        // The lattice vectors already include any rotation of the array.
        let col_step = Point::new((col_end.x - origin.x) / cols, (col_end.y - origin.y) / cols);
        let row_step = Point::new((row_end.x - origin.x) / rows, (row_end.y - origin.y) / rows);
        let orientation = match &aref.strans {
            Some(strans) => self.orientation(strans)?,
            None => Orientation::default(),
        };

        let mut insts = Vec::with_capacity((cols * rows) as usize);
        for col in 0..cols {
            for row in 0..rows {
                let inst = Instance::builder()
                    .name(arcstr::format!("{name}[{col}][{row}]"))
                    .cell(cell.clone())
                    .loc(Point::new(
                        origin.x + col * col_step.x + row * row_step.x,
                        origin.y + col * col_step.y + row * row_step.y,
                    ))
                    .orientation(orientation)
                    .build()
                    .map_err(|err| self.err(err.to_string()))?;
                insts.push(inst);
            }
        }
        self.steps.pop();
        Ok(insts)
    }

    fn orientation(&self, strans: &gds21::GdsStrans) -> LayoutResult<Orientation> {
        if strans.abs_mag || strans.abs_angle {
            return Err(self.err("absolute magnification or angle"));
        }
        if strans.mag.map_or(false, |mag| mag != 1.) {
            return Err(self.err("magnified instance"));
        }
        Ok(Orientation::from(strans))
    }

    fn err(&self, message: impl Into<String>) -> LayoutError {
        LayoutError::Import {
            message: message.into(),
            steps: self.steps.clone(),
        }
    }
}
