//! Using a `Multipool` to manage objects of several types:
//!
//! * Constructing objects of different types, routed to their pools at compile time.
//! * Accessing member pools directly.
//! * Releasing one member or all of them at once.

use block_pool::{DropPolicy, Multipool};

struct Vertex {
    x: f32,
    y: f32,
}

struct Triangle {
    corners: [u32; 3],
}

fn main() {
    let mut mesh = Multipool::<(Vertex, Triangle)>::builder()
        .initial_block_size(4)
        .drop_policy(DropPolicy::MustNotForgetItems)
        .build();

    let vertices: Vec<_> = (0..6_u16)
        .map(|i| {
            let offset = f32::from(i);
            mesh.construct(Vertex {
                x: offset,
                y: offset * 2.0,
            })
        })
        .collect();

    let triangle = mesh.construct(Triangle { corners: [0, 1, 2] });

    println!(
        "Vertices: {} in blocks {:?}",
        mesh.get::<Vertex, _>().len(),
        mesh.get::<Vertex, _>().block_sizes().collect::<Vec<_>>()
    );
    println!(
        "Triangles: {} in blocks {:?}",
        mesh.get::<Triangle, _>().len(),
        mesh.get::<Triangle, _>().block_sizes().collect::<Vec<_>>()
    );

    // SAFETY: The objects are alive and we hold no other references to them.
    unsafe {
        let corners = triangle.as_ref().corners;
        println!("First triangle: {corners:?}");

        for corner in corners {
            let index = usize::try_from(corner).expect("corner index fits in usize");
            let vertex = vertices
                .get(index)
                .expect("triangle refers to an existing vertex")
                .as_ref();
            println!("  corner {corner} at ({}, {})", vertex.x, vertex.y);
        }
    }

    // Triangles are done. Their memory can go back to the system without destroying them
    // one by one because they have no destructor.
    mesh.release::<Triangle, _>();
    println!(
        "Triangle pool is full after release: {}",
        mesh.get::<Triangle, _>().full()
    );

    // Same for the vertices. With `MustNotForgetItems` we have to release before dropping.
    mesh.release_all();
    println!("Objects left: {}", mesh.len());
}
