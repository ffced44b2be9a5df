//! 4DGS scene checkpoint implementation.
//!
//! A checkpoint is an 8-byte tag followed by a named MessagePack record.

pub use super::*;

use burn::record::{FullPrecisionSettings, NamedMpkBytesRecorder, Record, Recorder};
use std::{fmt, fs, path::Path};

/// The tag of [`Gaussian4dCheckpoint::Scene`].
pub const CHECKPOINT_TAG_SCENE: &[u8; 8] = b"GS4DSCNE";

/// The tag of [`Gaussian4dCheckpoint::Parameters`].
pub const CHECKPOINT_TAG_PARAMETERS: &[u8; 8] = b"GS4DPARM";

/// The nine parameter arrays without parameter ids.
///
/// The shapes are the same as the fields of [`Gaussian4dScene`].
#[derive(Record)]
pub struct Gaussian4dParameters<B: Backend> {
    pub colors_sh_dc: Tensor<B, 3>,
    pub colors_sh_rest: Tensor<B, 3>,
    pub durations: Tensor<B, 2>,
    pub opacities: Tensor<B, 2>,
    pub positions: Tensor<B, 2>,
    pub rotations: Tensor<B, 2>,
    pub scalings: Tensor<B, 2>,
    pub times: Tensor<B, 2>,
    pub velocities: Tensor<B, 2>,
}

/// The decoded content of a checkpoint.
pub enum Gaussian4dCheckpoint<B: Backend> {
    /// The full object, keeping the parameter ids.
    Scene(Gaussian4dScene<B>),
    /// The named parameter arrays.
    Parameters(Gaussian4dParameters<B>),
}

impl<B: Backend> Gaussian4dCheckpoint<B> {
    /// Decoding the bytes made by [`Gaussian4dScene::encode_checkpoint`]
    /// or [`Gaussian4dScene::encode_parameters`].
    pub fn decode(
        bytes: Vec<u8>,
        device: &B::Device,
    ) -> Result<Self, Error> {
        if bytes.len() < CHECKPOINT_TAG_SCENE.len() {
            return Err(Error::Load(format!(
                "The checkpoint is too short to have a tag ({} bytes)",
                bytes.len()
            )));
        }

        let (tag, _) = bytes.split_at(CHECKPOINT_TAG_SCENE.len());
        let is_scene = tag == CHECKPOINT_TAG_SCENE;
        let is_parameters = tag == CHECKPOINT_TAG_PARAMETERS;
        if !is_scene && !is_parameters {
            return Err(Error::Load(format!(
                "The checkpoint tag should be {:?} or {:?}, but got {:?}",
                String::from_utf8_lossy(CHECKPOINT_TAG_SCENE),
                String::from_utf8_lossy(CHECKPOINT_TAG_PARAMETERS),
                String::from_utf8_lossy(tag),
            )));
        }

        let record_bytes = bytes[CHECKPOINT_TAG_SCENE.len()..].to_vec();
        let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::new();

        if is_scene {
            let record: Gaussian4dSceneRecord<B> = recorder
                .load(record_bytes, device)
                .map_err(|error| {
                    Error::Load(format!("The scene record is undecodable: {error:?}"))
                })?;
            let scene = Gaussian4dScene::empty(0, device).load_record(record);
            scene.validate()?;
            Ok(Self::Scene(scene))
        } else {
            let parameters: Gaussian4dParameters<B> = recorder
                .load(record_bytes, device)
                .map_err(|error| {
                    Error::Load(format!("The parameter record is undecodable: {error:?}"))
                })?;
            Ok(Self::Parameters(parameters))
        }
    }

    /// Reading and decoding the checkpoint at `path`.
    pub fn read(
        path: impl AsRef<Path>,
        device: &B::Device,
    ) -> Result<Self, Error> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|error| {
            Error::Load(format!(
                "The checkpoint at {} is unreadable: {error}",
                path.display()
            ))
        })?;

        Self::decode(bytes, device)
    }

    /// Turning either form into a validated scene.
    pub fn into_scene(self) -> Result<Gaussian4dScene<B>, Error> {
        match self {
            Self::Scene(scene) => Ok(scene),
            Self::Parameters(parameters) => Gaussian4dScene::new(
                parameters.positions,
                parameters.scalings,
                parameters.rotations,
                parameters.opacities,
                parameters.colors_sh_dc,
                parameters.colors_sh_rest,
                parameters.times,
                parameters.durations,
                parameters.velocities,
            ),
        }
    }
}

/// Scene checkpoints
impl<B: Backend> Gaussian4dScene<B> {
    /// Encoding the full object, which keeps the parameter ids.
    pub fn encode_checkpoint(&self) -> Result<Vec<u8>, Error> {
        let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::new();
        let record_bytes = recorder.record(self.to_owned().into_record(), ())?;

        let mut bytes = CHECKPOINT_TAG_SCENE.to_vec();
        bytes.extend(record_bytes);
        Ok(bytes)
    }

    /// Encoding the named parameter arrays only.
    pub fn encode_parameters(&self) -> Result<Vec<u8>, Error> {
        let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::new();
        let record_bytes = recorder.record(self.to_parameters(), ())?;

        let mut bytes = CHECKPOINT_TAG_PARAMETERS.to_vec();
        bytes.extend(record_bytes);
        Ok(bytes)
    }

    /// Saving the full object to `path`.
    pub fn save(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<(), Error> {
        let bytes = self.encode_checkpoint()?;
        fs::write(path.as_ref(), &bytes)?;

        log::debug!(
            target: "gausplat::temporal::checkpoint",
            "Gaussian4dScene::save > {} ({} bytes)",
            path.as_ref().display(),
            bytes.len(),
        );

        Ok(())
    }

    /// Saving the named parameter arrays to `path`.
    pub fn save_parameters(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<(), Error> {
        let bytes = self.encode_parameters()?;
        fs::write(path.as_ref(), &bytes)?;

        log::debug!(
            target: "gausplat::temporal::checkpoint",
            "Gaussian4dScene::save_parameters > {} ({} bytes)",
            path.as_ref().display(),
            bytes.len(),
        );

        Ok(())
    }

    /// Loading a scene from the checkpoint at `path` in either form.
    pub fn load(
        path: impl AsRef<Path>,
        device: &B::Device,
    ) -> Result<Self, Error> {
        let scene = Gaussian4dCheckpoint::read(path.as_ref(), device)?.into_scene()?;

        log::debug!(
            target: "gausplat::temporal::checkpoint",
            "Gaussian4dScene::load > {} ({} points)",
            path.as_ref().display(),
            scene.point_count(),
        );

        Ok(scene)
    }

    /// The inner values of parameters.
    pub fn to_parameters(&self) -> Gaussian4dParameters<B> {
        Gaussian4dParameters {
            colors_sh_dc: self.colors_sh_dc.val(),
            colors_sh_rest: self.colors_sh_rest.val(),
            durations: self.durations.val(),
            opacities: self.opacities.val(),
            positions: self.positions.val(),
            rotations: self.rotations.val(),
            scalings: self.scalings.val(),
            times: self.times.val(),
            velocities: self.velocities.val(),
        }
    }
}

impl<B: Backend> fmt::Debug for Gaussian4dCheckpoint<B> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Scene(scene) => f.debug_tuple("Scene").field(scene).finish(),
            Self::Parameters(parameters) => f
                .debug_struct("Parameters")
                .field("positions.dims()", &parameters.positions.dims())
                .field("colors_sh_rest.dims()", &parameters.colors_sh_rest.dims())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{super::tests::*, *};
    use burn::backend::NdArray;
    use std::path::PathBuf;

    type B = NdArray<f32>;

    fn path_of(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "gausplat-temporal-{}-{name}.ckpt",
            std::process::id()
        ))
    }

    #[test]
    fn save_and_load_full_object() {
        let device = Default::default();
        let path = path_of("full-object");
        let scene = scene_of(6, 0.5);

        scene.save(&path).unwrap();
        let output = Gaussian4dScene::<B>::load(&path, &device).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_scene_eq(&output, &scene);
        assert_eq!(output.colors_sh_degree(), 1);
        assert_eq!(output.positions.id, scene.positions.id);
        assert_eq!(output.velocities.id, scene.velocities.id);
    }

    #[test]
    fn save_and_load_parameters() {
        let device = Default::default();
        let path = path_of("parameters");
        let scene = scene_of(4, -1.0);

        scene.save_parameters(&path).unwrap();
        let checkpoint = Gaussian4dCheckpoint::<B>::read(&path, &device).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(checkpoint, Gaussian4dCheckpoint::Parameters(_)));
        let output = checkpoint.into_scene().unwrap();
        assert_scene_eq(&output, &scene);
        assert_ne!(output.positions.id, scene.positions.id);
    }

    #[test]
    fn decode_empty_scene() {
        let device = Default::default();
        let scene = Gaussian4dScene::<B>::empty(2, &device);

        let bytes = scene.encode_checkpoint().unwrap();
        assert_eq!(&bytes[..8], CHECKPOINT_TAG_SCENE);
        let output = Gaussian4dCheckpoint::<B>::decode(bytes, &device)
            .unwrap()
            .into_scene()
            .unwrap();
        assert!(output.is_empty());
        assert_eq!(output.colors_sh_degree(), 2);
    }

    #[test]
    fn decode_invalid_parameters() {
        let device = Default::default();
        let mut parameters = scene_of(3, 0.0).to_parameters();
        parameters.times = Tensor::zeros([2, 1], &device);

        let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::new();
        let mut bytes = CHECKPOINT_TAG_PARAMETERS.to_vec();
        bytes.extend(recorder.record(parameters, ()).unwrap());

        let output = Gaussian4dCheckpoint::<B>::decode(bytes, &device)
            .unwrap()
            .into_scene();
        assert!(matches!(output, Err(Error::Shape(_))), "{output:?}");
    }

    #[test]
    fn decode_unknown_tag() {
        let device = Default::default();

        let output = Gaussian4dCheckpoint::<B>::decode(b"PLYFORMAT\n".to_vec(), &device);
        assert!(matches!(output, Err(Error::Load(_))), "{output:?}");

        let output = Gaussian4dCheckpoint::<B>::decode(b"GS4D".to_vec(), &device);
        assert!(matches!(output, Err(Error::Load(_))), "{output:?}");
    }

    #[test]
    fn decode_corrupted_record() {
        let device = Default::default();

        for (tag, record) in [
            (CHECKPOINT_TAG_SCENE, vec![0xc1, 0xff, 0x00, 0x13]),
            (CHECKPOINT_TAG_PARAMETERS, vec![0x90]),
            (CHECKPOINT_TAG_PARAMETERS, vec![]),
        ] {
            let mut bytes = tag.to_vec();
            bytes.extend(record);

            let output = Gaussian4dCheckpoint::<B>::decode(bytes, &device);
            assert!(matches!(output, Err(Error::Load(_))), "{output:?}");
        }
    }

    #[test]
    fn load_missing_file() {
        let device = Default::default();
        let path = path_of("missing");

        let output = Gaussian4dScene::<B>::load(&path, &device);
        match output {
            Err(Error::Load(message)) => {
                assert!(message.contains(&path.display().to_string()), "{message}")
            },
            output => panic!("{output:?}"),
        }
    }
}
