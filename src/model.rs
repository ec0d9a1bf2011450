//!
//! Model data, the consumer side of an evaluation.
//!

use glam::Mat4;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::base::SkinError;

static NEXT_MODEL_ID: AtomicU32 = AtomicU32::new(1);

/// Bones a mesh is skinned with, in the order its vertex weights expect,
/// and the bind-pose offset matrix of each bone.
#[derive(Debug)]
pub struct ModelData {
    id: u32,
    name: String,
    bone_names: Vec<String>,
    bone_offsets: Vec<Mat4>,
}

impl ModelData {
    pub fn new(
        name: impl Into<String>,
        bone_names: Vec<String>,
        bone_offsets: Vec<Mat4>,
    ) -> Result<ModelData, SkinError> {
        if bone_names.len() != bone_offsets.len() {
            return Err(SkinError::InvalidModel {
                names: bone_names.len(),
                offsets: bone_offsets.len(),
            });
        }
        Ok(ModelData {
            id: NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            bone_names,
            bone_offsets,
        })
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn bone_names(&self) -> &[String] {
        &self.bone_names
    }

    #[inline]
    pub fn bone_offsets(&self) -> &[Mat4] {
        &self.bone_offsets
    }

    #[inline]
    pub fn num_bones(&self) -> usize {
        self.bone_names.len()
    }

    /// Floats in an evaluation result for this model, 16 per bone.
    #[inline]
    pub fn num_floats(&self) -> usize {
        self.bone_names.len() * crate::base::MATRIX_FLOATS
    }

    pub(crate) fn to_raw(&self) -> ModelDataRaw {
        ModelDataRaw {
            name: self.name.clone(),
            bone_names: self.bone_names.clone(),
            bone_offsets: self.bone_offsets.clone(),
        }
    }

    pub(crate) fn from_raw(raw: ModelDataRaw) -> Result<ModelData, SkinError> {
        ModelData::new(raw.name, raw.bone_names, raw.bone_offsets)
    }
}

#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub(crate) struct ModelDataRaw {
    pub name: String,
    pub bone_names: Vec<String>,
    pub bone_offsets: Vec<Mat4>,
}

#[cfg(feature = "serde")]
const _: () = {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for ModelData {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            self.to_raw().serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for ModelData {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<ModelData, D::Error> {
            let raw = ModelDataRaw::deserialize(deserializer)?;
            ModelData::from_raw(raw).map_err(D::Error::custom)
        }
    }
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_data_new() {
        let model = ModelData::new("beta", vec!["hips".into(), "spine".into()], vec![Mat4::IDENTITY; 2]).unwrap();
        assert_eq!(model.num_bones(), 2);
        assert_eq!(model.num_floats(), 32);
        assert_eq!(model.bone_names()[1], "spine");

        let other = ModelData::new("beta", vec![], vec![]).unwrap();
        assert_ne!(model.id(), other.id());
        assert_eq!(other.num_bones(), 0);
    }

    #[test]
    fn test_model_data_length_mismatch() {
        let err = ModelData::new("beta", vec!["hips".into()], vec![]).unwrap_err();
        assert!(err.is_invalid_model());
        assert_eq!(err, SkinError::InvalidModel { names: 1, offsets: 0 });
    }
}
