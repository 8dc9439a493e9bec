use super::*;

fn order_with(width: u32, height: u32, pixels: &[(usize, [u8; 4])]) -> RgbaBitmap {
    let mut bmp = RgbaBitmap::filled(width, height, [0, 0, 0, 0]);
    for &(i, rgba) in pixels {
        bmp.put(i, rgba);
    }
    bmp
}

#[test]
fn real_work_is_exactly_nonzero_alpha_ascending() {
    let order = order_with(
        4,
        4,
        &[
            (13, [1, 1, 1, 1]),
            (2, [255, 255, 255, 255]),
            (7, [0, 0, 0, 200]),
            (8, [9, 9, 9, 0]),
        ],
    );
    let work: Vec<usize> = real_work(&order).collect();
    assert_eq!(work, vec![2, 7, 13]);
}

#[test]
fn real_work_is_restartable_and_idempotent() {
    let order = order_with(3, 3, &[(0, [1, 2, 3, 255]), (8, [1, 2, 3, 255])]);
    let it = real_work(&order);
    let a: Vec<usize> = it.clone().collect();
    let b: Vec<usize> = it.collect();
    let c: Vec<usize> = real_work(&order).collect();
    assert_eq!(a, b);
    assert_eq!(b, c);
}

#[test]
fn fully_transparent_order_has_no_work() {
    let order = RgbaBitmap::filled(5, 5, [255, 0, 0, 0]);
    assert_eq!(real_work(&order).count(), 0);
}

#[test]
fn pending_is_subset_and_ignores_canvas_alpha() {
    let order = order_with(
        3,
        1,
        &[(0, [255, 0, 0, 255]), (1, [0, 255, 0, 255]), (2, [0, 0, 255, 255])],
    );
    let mut canvas = RgbaBitmap::filled(3, 1, [0, 0, 0, 255]);
    canvas.put(0, [255, 0, 0, 17]);
    canvas.put(2, [0, 0, 255, 0]);

    let real: Vec<usize> = real_work(&order).collect();
    let pending = pending_work(real.iter().copied(), &order, &canvas).unwrap();
    assert_eq!(pending, vec![1]);
    assert!(pending.iter().all(|i| real.contains(i)));
}

#[test]
fn pending_empty_when_everything_matches() {
    let order = order_with(2, 2, &[(0, [1, 2, 3, 255]), (3, [4, 5, 6, 255])]);
    let mut canvas = RgbaBitmap::filled(2, 2, [7, 7, 7, 255]);
    canvas.put(0, [1, 2, 3, 255]);
    canvas.put(3, [4, 5, 6, 255]);
    let pending = pending_work(real_work(&order), &order, &canvas).unwrap();
    assert!(pending.is_empty());
}

#[test]
fn pending_rejects_mismatched_dimensions() {
    let order = RgbaBitmap::filled(2, 2, [0, 0, 0, 255]);
    let canvas = RgbaBitmap::filled(2, 3, [0, 0, 0, 255]);
    assert!(pending_work(real_work(&order), &order, &canvas).is_err());
}

#[test]
fn percent_complete_rounds_pending_up() {
    let s = |real, pending| WorkSummary { real, pending }.percent_complete();
    assert_eq!(s(0, 0), 100);
    assert_eq!(s(10, 0), 100);
    assert_eq!(s(10, 10), 0);
    assert_eq!(s(3, 1), 66);
    assert_eq!(s(1000, 1), 99);
    assert!(WorkSummary { real: 4, pending: 0 }.is_done());
}
