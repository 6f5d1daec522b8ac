//! Low-level structured stream: little-endian primitive tokens with
//! symmetric read/write, shared by the octree and AMI serializers.
//!
//! Writers and readers must agree on token order exactly; any drift silently
//! corrupts restarts, so each serializer keeps its write and read paths side
//! by side.

use std::io::{Read, Write};

use crate::types::{Error, Point3, RealScalar, Result};

/// Write a raw `u64` token.
pub fn write_u64<W: Write>(w: &mut W, v: u64) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Read a raw `u64` token.
pub fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    Ok(u64::from_le_bytes(b))
}

/// Write a raw `i64` token.
pub fn write_i64<W: Write>(w: &mut W, v: i64) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Read a raw `i64` token.
pub fn read_i64<R: Read>(r: &mut R) -> Result<i64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    Ok(i64::from_le_bytes(b))
}

/// Write a count/index token.
pub fn write_usize<W: Write>(w: &mut W, v: usize) -> Result<()> {
    write_u64(w, v as u64)
}

/// Read a count/index token.
pub fn read_usize<R: Read>(r: &mut R) -> Result<usize> {
    Ok(read_u64(r)? as usize)
}

/// Write a scalar token (as `f64`).
pub fn write_scalar<T: RealScalar, W: Write>(w: &mut W, v: T) -> Result<()> {
    let v = v
        .to_f64()
        .ok_or_else(|| Error::Corrupt("scalar not representable as f64".into()))?;
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Read a scalar token.
pub fn read_scalar<T: RealScalar, R: Read>(r: &mut R) -> Result<T> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    let v = f64::from_le_bytes(b);
    T::from(v).ok_or_else(|| Error::Corrupt(format!("scalar {v} not representable")))
}

/// Write a 3D point as three scalar tokens.
pub fn write_point<T: RealScalar, W: Write>(w: &mut W, p: &Point3<T>) -> Result<()> {
    for d in 0..3 {
        write_scalar(w, p[d])?;
    }
    Ok(())
}

/// Read a 3D point.
pub fn read_point<T: RealScalar, R: Read>(r: &mut R) -> Result<Point3<T>> {
    Ok([read_scalar(r)?, read_scalar(r)?, read_scalar(r)?])
}

/// Write a length-prefixed index list.
pub fn write_index_list<W: Write>(w: &mut W, list: &[usize]) -> Result<()> {
    write_usize(w, list.len())?;
    for &i in list {
        write_usize(w, i)?;
    }
    Ok(())
}

/// Read a length-prefixed index list.
pub fn read_index_list<R: Read>(r: &mut R) -> Result<Vec<usize>> {
    let n = read_usize(r)?;
    let mut list = Vec::with_capacity(n.min(1 << 20));
    for _ in 0..n {
        list.push(read_usize(r)?);
    }
    Ok(list)
}

/// Write a length-prefixed scalar list.
pub fn write_scalar_list<T: RealScalar, W: Write>(w: &mut W, list: &[T]) -> Result<()> {
    write_usize(w, list.len())?;
    for &v in list {
        write_scalar(w, v)?;
    }
    Ok(())
}

/// Read a length-prefixed scalar list.
pub fn read_scalar_list<T: RealScalar, R: Read>(r: &mut R) -> Result<Vec<T>> {
    let n = read_usize(r)?;
    let mut list = Vec::with_capacity(n.min(1 << 20));
    for _ in 0..n {
        list.push(read_scalar(r)?);
    }
    Ok(list)
}

/// Write a 4-byte section tag.
pub fn write_tag<W: Write>(w: &mut W, tag: &[u8; 4]) -> Result<()> {
    w.write_all(tag)?;
    Ok(())
}

/// Read a 4-byte section tag and check it against the expected value.
pub fn expect_tag<R: Read>(r: &mut R, tag: &[u8; 4]) -> Result<()> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    if &b != tag {
        return Err(Error::Corrupt(format!(
            "expected tag {:?}, found {:?}",
            String::from_utf8_lossy(tag),
            String::from_utf8_lossy(&b)
        )));
    }
    Ok(())
}
