pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Composite one premultiplied RGBA8 pixel over an opaque straight RGB background.
pub(crate) fn flatten_premul_over(px: [u8; 4], bg: [u8; 3]) -> [u8; 3] {
    let inv = 255u16 - u16::from(px[3]);
    let ch = |c: u8, b: u8| -> u8 {
        (u16::from(c) + mul_div255_u16(u16::from(b), inv)).min(255) as u8
    };
    [ch(px[0], bg[0]), ch(px[1], bg[1]), ch(px[2], bg[2])]
}
