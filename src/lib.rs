//! # Graphics Packer
//!
//! Packages a tree of source artwork into the folder layout a game expects.
//! Small JSON rule files scattered through the source tree decide, per image,
//! which destination folders receive it, under which names, and how it is
//! cropped. Each destination folder has a fixed canvas size, padding, opacity,
//! and optional mask.
//!
//! # Architecture: Scan → Resolve → Plan → Transform
//!
//! ```text
//! 1. Scan       source_folder/  →  rule index + candidate images
//! 2. Resolve    rules × image   →  one EffectiveConfig per image (pure fold)
//! 3. Plan       configs         →  every output path, collisions rejected
//! 4. Transform  plan            →  graphics_folder/  (parallel, rayon)
//! ```
//!
//! Steps 1–3 never write anything; `graphics-packer check` stops after them.
//! Only step 4 touches the graphics folder, and by then every rule has been
//! validated and every output path is known to be unique.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`settings`] | `settings.json` loading: folders, destination templates, processing options |
//! | [`destination`] | Destination specs (canvas geometry, padding, opacity, mask) and their registry |
//! | [`rules`] | Rule document parsing, schema validation, and the precedence-ordered rule index |
//! | [`resolve`] | The cascade: applicable rules folded into one effective config per image |
//! | [`scan`] | Walks the source folder for rule documents and supported images |
//! | [`process`] | Output planning, mask preloading, parallel transform, error policy |
//! | [`imaging`] | Pure crop/scale geometry, the pixel pipeline, and the `image`-crate backend |
//! | [`naming`] | Lexical path normalization, destination identities, `{folder}` substitution |
//! | [`types`] | Shared identities: `DestinationId`, `ImageSource` |
//! | [`output`] | CLI output formatting |
//!
//! # Precedence
//!
//! Rules apply most general first, so later ones win:
//!
//! ```text
//! artwork/_config.json                ← depth 1: applies first
//! artwork/clubs/_config.json          ← depth 2
//!     "."        folder rule          ←   folder rules before file rules
//!     "arsenal"  file rule            ←   applies last, has the final say
//! ```
//!
//! Fields a rule does not mention are inherited untouched. The merge rules
//! live in [`resolve`].

pub mod destination;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod process;
pub mod resolve;
pub mod rules;
pub mod scan;
pub mod settings;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
