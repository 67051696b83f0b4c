//! Contour extraction over binary masks: connected-component labeling,
//! Moore-neighbor boundary tracing, and Ramer-Douglas-Peucker polygon
//! approximation.

use crate::services::detect::mask::BitMask;
use crate::types::BoundingBox;

/// A traced connected component, in region-local coordinates.
#[derive(Debug, Clone)]
pub struct Contour {
    /// Ordered closed boundary.
    pub boundary: Vec<(u32, u32)>,
    /// Component pixel count.
    pub area: f64,
    /// Component mass center.
    pub centroid: (f64, f64),
    pub bounds: BoundingBox,
}

impl Contour {
    /// Closed boundary length.
    pub fn perimeter(&self) -> f64 {
        if self.boundary.len() < 2 {
            return 0.0;
        }
        let mut length = 0.0;
        for pair in self.boundary.windows(2) {
            length += segment_length(pair[0], pair[1]);
        }
        length + segment_length(*self.boundary.last().unwrap(), self.boundary[0])
    }
}

fn segment_length(a: (u32, u32), b: (u32, u32)) -> f64 {
    let dx = a.0 as f64 - b.0 as f64;
    let dy = a.1 as f64 - b.1 as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Extract all 8-connected foreground components of a mask as contours.
pub fn find_contours(mask: &BitMask) -> Vec<Contour> {
    let width = mask.width();
    let height = mask.height();
    let mut visited = vec![false; (width * height) as usize];
    let mut contours = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let idx = (y * width + x) as usize;
            if visited[idx] || !mask.get(x, y) {
                continue;
            }

            // Flood the component; the scan order makes (x, y) its
            // topmost-leftmost pixel, which Moore tracing needs.
            let mut stack = vec![(x, y)];
            visited[idx] = true;
            let mut count = 0u64;
            let (mut sum_x, mut sum_y) = (0.0f64, 0.0f64);
            let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);

            while let Some((cx, cy)) = stack.pop() {
                count += 1;
                sum_x += cx as f64;
                sum_y += cy as f64;
                min_x = min_x.min(cx);
                min_y = min_y.min(cy);
                max_x = max_x.max(cx);
                max_y = max_y.max(cy);

                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        let nx = cx as i64 + dx;
                        let ny = cy as i64 + dy;
                        if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                            continue;
                        }
                        let nidx = (ny as u32 * width + nx as u32) as usize;
                        if !visited[nidx] && mask.get(nx as u32, ny as u32) {
                            visited[nidx] = true;
                            stack.push((nx as u32, ny as u32));
                        }
                    }
                }
            }

            let boundary = trace_boundary(mask, (x, y), 4 * count as usize + 8);
            contours.push(Contour {
                boundary,
                area: count as f64,
                centroid: (sum_x / count as f64, sum_y / count as f64),
                bounds: BoundingBox {
                    x: min_x,
                    y: min_y,
                    width: max_x - min_x + 1,
                    height: max_y - min_y + 1,
                },
            });
        }
    }

    contours
}

/// Clockwise 8-neighborhood starting west.
const NEIGHBORS: [(i64, i64); 8] = [
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
];

/// Moore-neighbor boundary tracing from the component's topmost-leftmost
/// pixel. `max_steps` bounds the walk against pathological masks.
fn trace_boundary(mask: &BitMask, start: (u32, u32), max_steps: usize) -> Vec<(u32, u32)> {
    let in_mask = |x: i64, y: i64| x >= 0 && y >= 0 && mask.get(x as u32, y as u32);

    let mut boundary = vec![start];
    let mut current = (start.0 as i64, start.1 as i64);
    // The west neighbor of the topmost-leftmost pixel is background.
    let mut backtrack_dir = 0usize;

    for _ in 0..max_steps {
        let mut found = None;
        for step in 1..=8 {
            let dir = (backtrack_dir + step) % 8;
            let (dx, dy) = NEIGHBORS[dir];
            let nx = current.0 + dx;
            let ny = current.1 + dy;
            if in_mask(nx, ny) {
                found = Some((dir, (nx, ny)));
                break;
            }
        }

        let Some((dir, next)) = found else {
            break; // isolated pixel
        };

        if (next.0 as u32, next.1 as u32) == start && boundary.len() > 1 {
            break;
        }

        boundary.push((next.0 as u32, next.1 as u32));
        current = next;
        // Re-enter the neighborhood scan from the direction pointing back
        // toward the previously checked (background) cell.
        backtrack_dir = (dir + 5) % 8;
    }

    boundary
}

/// Approximate a closed contour with a simpler polygon whose vertices stay
/// within `epsilon` of the boundary.
pub fn approx_polygon(boundary: &[(u32, u32)], epsilon: f64) -> Vec<(f64, f64)> {
    let points: Vec<(f64, f64)> = boundary.iter().map(|&(x, y)| (x as f64, y as f64)).collect();
    if points.len() < 3 {
        return points;
    }

    // Split the closed curve at its two farthest-apart points and simplify
    // each half as an open polyline.
    let (mut best_i, mut best_j, mut best_dist) = (0usize, 0usize, -1.0f64);
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let dx = points[i].0 - points[j].0;
            let dy = points[i].1 - points[j].1;
            let d = dx * dx + dy * dy;
            if d > best_dist {
                best_dist = d;
                best_i = i;
                best_j = j;
            }
        }
    }

    let rotated: Vec<(f64, f64)> = points[best_i..]
        .iter()
        .chain(points[..best_i].iter())
        .copied()
        .collect();
    let split = best_j - best_i;

    let mut second_half = rotated[split..].to_vec();
    second_half.push(rotated[0]);

    let mut out = Vec::new();
    rdp(&rotated[..=split], epsilon, &mut out);
    rdp(&second_half, epsilon, &mut out);
    out
}

/// Ramer-Douglas-Peucker over an open polyline; appends every kept vertex
/// except the final endpoint (the caller chains segments).
fn rdp(points: &[(f64, f64)], epsilon: f64, out: &mut Vec<(f64, f64)>) {
    if points.len() < 2 {
        out.extend(points.iter().copied());
        return;
    }

    let first = points[0];
    let last = *points.last().unwrap();

    let (mut max_dist, mut max_idx) = (0.0f64, 0usize);
    for (i, p) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let d = perpendicular_distance(*p, first, last);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > epsilon {
        rdp(&points[..=max_idx], epsilon, out);
        rdp(&points[max_idx..], epsilon, out);
    } else {
        out.push(first);
    }
}

fn perpendicular_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    let norm = (dx * dx + dy * dy).sqrt();
    if norm == 0.0 {
        let px = p.0 - a.0;
        let py = p.1 - a.1;
        return (px * px + py * py).sqrt();
    }
    ((p.0 - a.0) * dy - (p.1 - a.1) * dx).abs() / norm
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_triangle_mask() -> BitMask {
        // Upward triangle: apex at (10, 4), base row y=14 spanning x 0..=20.
        let mut mask = BitMask::new(24, 20);
        for y in 4..=14u32 {
            let half = y - 4;
            for x in (10 - half.min(10))..=(10 + half).min(23) {
                mask.set(x, y, true);
            }
        }
        mask
    }

    #[test]
    fn test_find_single_component() {
        let mask = filled_triangle_mask();
        let contours = find_contours(&mask);
        assert_eq!(contours.len(), 1);
        let c = &contours[0];
        assert!(c.area > 100.0);
        assert_eq!(c.bounds.y, 4);
        assert_eq!(c.bounds.height, 11);
    }

    #[test]
    fn test_boundary_is_closed_walk() {
        let mask = filled_triangle_mask();
        let contours = find_contours(&mask);
        let boundary = &contours[0].boundary;
        assert!(boundary.len() >= 3);
        for pair in boundary.windows(2) {
            let dx = (pair[0].0 as i64 - pair[1].0 as i64).abs();
            let dy = (pair[0].1 as i64 - pair[1].1 as i64).abs();
            assert!(dx <= 1 && dy <= 1, "boundary jumped: {:?}", pair);
        }
    }

    #[test]
    fn test_triangle_approximates_to_three_vertices() {
        let mask = filled_triangle_mask();
        let contours = find_contours(&mask);
        let c = &contours[0];
        let mut accepted = None;
        for factor in [0.02, 0.03, 0.04, 0.05] {
            let approx = approx_polygon(&c.boundary, factor * c.perimeter());
            if approx.len() == 3 {
                accepted = Some(approx);
                break;
            }
        }
        let vertices = accepted.expect("triangle never reduced to 3 vertices");
        let apex = vertices
            .iter()
            .cloned()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap();
        assert!(apex.1 <= 6.0, "apex should sit near the top, got {:?}", apex);
    }

    #[test]
    fn test_two_components_found() {
        let mut mask = BitMask::new(30, 10);
        for x in 1..4 {
            for y in 1..4 {
                mask.set(x, y, true);
                mask.set(x + 20, y, true);
            }
        }
        let contours = find_contours(&mask);
        assert_eq!(contours.len(), 2);
    }

    #[test]
    fn test_isolated_pixel() {
        let mut mask = BitMask::new(5, 5);
        mask.set(2, 2, true);
        let contours = find_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].boundary, vec![(2, 2)]);
        assert_eq!(contours[0].area, 1.0);
    }
}
