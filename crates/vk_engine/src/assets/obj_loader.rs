//! OBJ loader producing flat triangle lists

use std::path::Path;

use crate::assets::AssetError;
use crate::render::primitives::Vertex;

/// Load every model in an OBJ file into one triangle list
///
/// Faces are triangulated. Vertex color is set to the normal, and the V
/// texture coordinate is flipped for Vulkan's top-left image origin.
pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Vec<Vertex>, AssetError> {
    let path_ref = path.as_ref();
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };

    let (models, _materials) = tobj::load_obj(path_ref, &options).map_err(|e| AssetError::Obj {
        path: path_ref.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut vertices = Vec::new();
    for model in &models {
        let mesh = &model.mesh;
        for &index in &mesh.indices {
            vertices.push(vertex_at(mesh, index as usize));
        }
    }

    if vertices.is_empty() {
        return Err(AssetError::Empty(path_ref.display().to_string()));
    }

    log::info!("Loaded {} vertices from {:?}", vertices.len(), path_ref);
    Ok(vertices)
}

fn vertex_at(mesh: &tobj::Mesh, i: usize) -> Vertex {
    let position = [
        mesh.positions[3 * i],
        mesh.positions[3 * i + 1],
        mesh.positions[3 * i + 2],
    ];
    let normal = if mesh.normals.len() >= 3 * i + 3 {
        [mesh.normals[3 * i], mesh.normals[3 * i + 1], mesh.normals[3 * i + 2]]
    } else {
        [0.0; 3]
    };
    let uv = if mesh.texcoords.len() >= 2 * i + 2 {
        [mesh.texcoords[2 * i], 1.0 - mesh.texcoords[2 * i + 1]]
    } else {
        [0.0; 2]
    };

    Vertex {
        position,
        normal,
        color: normal,
        uv,
    }
}
