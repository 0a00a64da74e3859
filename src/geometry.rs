/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// `p' = [a -b; b a] p + t`: uniform scale, rotation and translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityTransform2D {
    pub a: f64,
    pub b: f64,
    pub tx: f64,
    pub ty: f64,
}

impl SimilarityTransform2D {
    pub fn apply(&self, p: Point) -> Point {
        let (x, y) = (f64::from(p.x), f64::from(p.y));
        Point::new(
            (self.a * x - self.b * y + self.tx) as f32,
            (self.b * x + self.a * y + self.ty) as f32,
        )
    }

    pub fn scale(&self) -> f64 {
        self.a.hypot(self.b)
    }
}

/// Least-squares similarity transform taking `from[i]` onto `to[i]`.
///
/// Returns `None` when the points are not finite, the slices differ in
/// length, or either set collapses to a single point.
pub fn find_similarity_transform(from: &[Point], to: &[Point]) -> Option<SimilarityTransform2D> {
    if from.is_empty() || from.len() != to.len() {
        return None;
    }
    if from
        .iter()
        .chain(to)
        .any(|p| !p.x.is_finite() || !p.y.is_finite())
    {
        return None;
    }

    let n = from.len() as f64;
    let centroid = |pts: &[Point]| {
        let (sx, sy) = pts.iter().fold((0.0, 0.0), |(sx, sy), p| {
            (sx + f64::from(p.x), sy + f64::from(p.y))
        });
        (sx / n, sy / n)
    };
    let (fx, fy) = centroid(from);
    let (tx, ty) = centroid(to);

    let mut denom = 0.0;
    let mut spread_to = 0.0;
    let mut num_a = 0.0;
    let mut num_b = 0.0;
    for (p, q) in from.iter().zip(to) {
        let (u, v) = (f64::from(p.x) - fx, f64::from(p.y) - fy);
        let (x, y) = (f64::from(q.x) - tx, f64::from(q.y) - ty);
        denom += u * u + v * v;
        spread_to += x * x + y * y;
        num_a += u * x + v * y;
        num_b += u * y - v * x;
    }
    if denom < 1e-9 || spread_to < 1e-9 {
        return None;
    }

    let a = num_a / denom;
    let b = num_b / denom;
    Some(SimilarityTransform2D {
        a,
        b,
        tx: tx - (a * fx - b * fy),
        ty: ty - (b * fx + a * fy),
    })
}
