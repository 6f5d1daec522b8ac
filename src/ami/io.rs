//! Stream serialization of the full interpolation state, for
//! restart/checkpoint purposes. Token order is fixed and the read path
//! mirrors the write path exactly.

use std::io::{Read, Write};

use crate::ami::{Addressing, AmiInterpolation, AmiMethod, Distribution};
use crate::parallel::DistributionMap;
use crate::stream;
use crate::types::{Error, RealScalar, Result};

const TAG: &[u8; 4] = b"AMI1";

fn write_distribution<W: Write>(w: &mut W, d: Distribution) -> Result<()> {
    let code = match d {
        Distribution::Empty => -1,
        Distribution::Distributed => -2,
        Distribution::Local(rank) => rank as i64,
    };
    stream::write_i64(w, code)
}

fn read_distribution<R: Read>(r: &mut R) -> Result<Distribution> {
    match stream::read_i64(r)? {
        -1 => Ok(Distribution::Empty),
        -2 => Ok(Distribution::Distributed),
        rank if rank >= 0 => Ok(Distribution::Local(rank as usize)),
        code => Err(Error::Corrupt(format!("invalid distribution code {code}"))),
    }
}

fn write_map<W: Write>(w: &mut W, map: &DistributionMap) -> Result<()> {
    stream::write_usize(w, map.sub_map.len())?;
    for list in &map.sub_map {
        stream::write_index_list(w, list)?;
    }
    stream::write_usize(w, map.construct_map.len())?;
    for list in &map.construct_map {
        stream::write_index_list(w, list)?;
    }
    stream::write_usize(w, map.construct_size)
}

fn read_map<R: Read>(r: &mut R) -> Result<DistributionMap> {
    let n_sub = stream::read_usize(r)?;
    let mut sub_map = Vec::with_capacity(n_sub.min(1 << 16));
    for _ in 0..n_sub {
        sub_map.push(stream::read_index_list(r)?);
    }
    let n_con = stream::read_usize(r)?;
    let mut construct_map = Vec::with_capacity(n_con.min(1 << 16));
    for _ in 0..n_con {
        construct_map.push(stream::read_index_list(r)?);
    }
    let construct_size = stream::read_usize(r)?;
    Ok(DistributionMap {
        sub_map,
        construct_map,
        construct_size,
    })
}

fn write_side<T: RealScalar, W: Write>(w: &mut W, side: &Addressing<T>) -> Result<()> {
    stream::write_usize(w, side.addresses.len())?;
    for (addrs, ws) in side.addresses.iter().zip(&side.weights) {
        stream::write_index_list(w, addrs)?;
        stream::write_scalar_list(w, ws)?;
    }
    stream::write_scalar_list(w, &side.weight_sums)?;
    stream::write_scalar_list(w, &side.areas)?;
    for c in &side.centroids {
        stream::write_point(w, c)?;
    }
    write_map(w, &side.map)
}

fn read_side<T: RealScalar, R: Read>(r: &mut R) -> Result<Addressing<T>> {
    let n_faces = stream::read_usize(r)?;
    let mut addresses = Vec::with_capacity(n_faces.min(1 << 20));
    let mut weights = Vec::with_capacity(n_faces.min(1 << 20));
    for f in 0..n_faces {
        let addrs = stream::read_index_list(r)?;
        let ws: Vec<T> = stream::read_scalar_list(r)?;
        if addrs.len() != ws.len() {
            return Err(Error::Corrupt(format!(
                "face {}: {} addresses but {} weights",
                f,
                addrs.len(),
                ws.len()
            )));
        }
        addresses.push(addrs);
        weights.push(ws);
    }
    let weight_sums: Vec<T> = stream::read_scalar_list(r)?;
    let areas: Vec<T> = stream::read_scalar_list(r)?;
    if weight_sums.len() != n_faces || areas.len() != n_faces {
        return Err(Error::Corrupt(format!(
            "side with {} faces carries {} weight sums, {} areas",
            n_faces,
            weight_sums.len(),
            areas.len()
        )));
    }
    let mut centroids = Vec::with_capacity(n_faces.min(1 << 20));
    for _ in 0..n_faces {
        centroids.push(stream::read_point(r)?);
    }
    Ok(Addressing {
        addresses,
        weights,
        weight_sums,
        areas,
        centroids,
        map: read_map(r)?,
    })
}

impl<T: RealScalar> AmiInterpolation<T> {
    /// Write the full interpolation state to a stream.
    pub fn write_stream<W: Write>(&self, w: &mut W) -> Result<()> {
        stream::write_tag(w, TAG)?;
        let name = self.method.name().as_bytes();
        stream::write_usize(w, name.len())?;
        w.write_all(name)?;
        stream::write_scalar(w, self.low_weight_correction)?;
        stream::write_u64(w, u64::from(self.up_to_date))?;
        write_distribution(w, self.distribution)?;
        write_side(w, &self.src)?;
        write_side(w, &self.tgt)
    }

    /// Read an interpolation previously written with
    /// [`AmiInterpolation::write_stream`].
    pub fn read_stream<R: Read>(r: &mut R) -> Result<Self> {
        stream::expect_tag(r, TAG)?;
        let name_len = stream::read_usize(r)?;
        if name_len > 64 {
            return Err(Error::Corrupt(format!(
                "method name length {name_len} out of range"
            )));
        }
        let mut name = vec![0u8; name_len];
        r.read_exact(&mut name)?;
        let name = String::from_utf8(name)
            .map_err(|_| Error::Corrupt("method name is not valid UTF-8".into()))?;
        let method = AmiMethod::from_name(&name)?;
        let low_weight_correction: T = stream::read_scalar(r)?;
        let up_to_date = stream::read_u64(r)? != 0;
        let distribution = read_distribution(r)?;
        let src = read_side(r)?;
        let tgt = read_side(r)?;
        Ok(Self {
            method,
            low_weight_correction,
            up_to_date,
            distribution,
            src,
            tgt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::SerialComm;
    use crate::patch::SurfacePatch;

    fn patches() -> (SurfacePatch<f64>, SurfacePatch<f64>) {
        let single = SurfacePatch::new(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            vec![vec![0, 1, 2, 3]],
        );
        let mut points = Vec::new();
        for j in 0..3 {
            for i in 0..3 {
                points.push([i as f64 * 0.5, j as f64 * 0.5, 0.0]);
            }
        }
        let face = |i: usize, j: usize| {
            vec![j * 3 + i, j * 3 + i + 1, (j + 1) * 3 + i + 1, (j + 1) * 3 + i]
        };
        let quads = SurfacePatch::new(points, vec![face(0, 0), face(1, 0), face(0, 1), face(1, 1)]);
        (single, quads)
    }

    #[test]
    fn test_round_trip() {
        let (mut src, mut tgt) = patches();
        let mut ami = AmiInterpolation::new(AmiMethod::FaceAreaWeight, 1e-3);
        ami.calculate(&mut src, &mut tgt, None, &SerialComm);
        ami.normalise_weights(true);

        let mut buf = Vec::new();
        ami.write_stream(&mut buf).unwrap();
        let copy = AmiInterpolation::<f64>::read_stream(&mut buf.as_slice()).unwrap();

        assert_eq!(copy.method(), ami.method());
        assert_eq!(copy.up_to_date(), ami.up_to_date());
        assert_eq!(copy.distribution(), ami.distribution());
        assert_eq!(copy.source_addresses(), ami.source_addresses());
        assert_eq!(copy.source_weights(), ami.source_weights());
        assert_eq!(copy.target_addresses(), ami.target_addresses());
        assert_eq!(copy.target_weight_sums(), ami.target_weight_sums());
    }

    #[test]
    fn test_truncated_stream_errors() {
        let (mut src, mut tgt) = patches();
        let mut ami = AmiInterpolation::new(AmiMethod::MapNearest, 0.0);
        ami.calculate(&mut src, &mut tgt, None, &SerialComm);

        let mut buf = Vec::new();
        ami.write_stream(&mut buf).unwrap();
        buf.truncate(buf.len() / 2);
        assert!(AmiInterpolation::<f64>::read_stream(&mut buf.as_slice()).is_err());
    }

    #[test]
    fn test_bad_method_name_is_rejected() {
        let (mut src, mut tgt) = patches();
        let mut ami = AmiInterpolation::new(AmiMethod::FaceAreaWeight, 0.0);
        ami.calculate(&mut src, &mut tgt, None, &SerialComm);

        let mut buf = Vec::new();
        ami.write_stream(&mut buf).unwrap();
        // Corrupt the method name in place (it follows the 4-byte tag and
        // the 8-byte length)
        buf[12] = b'x';
        assert!(AmiInterpolation::<f64>::read_stream(&mut buf.as_slice()).is_err());
    }
}
